//! Fluent scenario construction, mostly for tests and ad-hoc runs.

use serde_json::{Map, Value};

use super::{PersonalityExpectedOutcome, Scenario};
use crate::content::{
    ChatMessageContent, Content, ContentAuthor, EmailContent, GenericContent, NewsArticleContent,
    SocialPostContent, ThreadContent, ThreadData, ThreadMessage,
};
use crate::evaluation::VisibilityState;

/// Builder for a [`Scenario`] of any content variant.
///
/// ```
/// use personality_harness::scenario::ScenarioBuilder;
///
/// let scenario = ScenarioBuilder::social_post("gallery_launch", "New AI art gallery", "instagram")
///     .images(["https://example.com/a.png"])
///     .engagement(120, 14, 9)
///     .domain("creative_tools")
///     .expect_personality("creative_artist", &[], true, 0.9)
///     .build();
/// assert_eq!(scenario.content.display_title(), "Instagram Post");
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    description: String,
    content: Content,
    context: Map<String, Value>,
    expectations: Vec<PersonalityExpectedOutcome>,
}

impl ScenarioBuilder {
    fn with_content(name: impl Into<String>, content: Content) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            content,
            context: Map::new(),
            expectations: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Variant constructors
    // -----------------------------------------------------------------------

    pub fn thread(
        name: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self::with_content(
            name,
            Content::Thread(ThreadContent {
                thread_data: ThreadData {
                    title: title.into(),
                    content: body.into(),
                    author_name: author.into(),
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
    }

    pub fn chat_message(
        name: impl Into<String>,
        text: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self::with_content(
            name,
            Content::ChatMessage(ChatMessageContent {
                content: text.into(),
                author: ContentAuthor::new(author),
                ..Default::default()
            }),
        )
    }

    pub fn email(
        name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self::with_content(
            name,
            Content::Email(EmailContent {
                subject: subject.into(),
                body: body.into(),
                from: ContentAuthor::new(from),
                ..Default::default()
            }),
        )
    }

    pub fn social_post(
        name: impl Into<String>,
        text: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self::with_content(
            name,
            Content::SocialPost(SocialPostContent {
                text: text.into(),
                platform: platform.into(),
                ..Default::default()
            }),
        )
    }

    pub fn news_article(
        name: impl Into<String>,
        headline: impl Into<String>,
        body: impl Into<String>,
        publication: impl Into<String>,
    ) -> Self {
        Self::with_content(
            name,
            Content::NewsArticle(NewsArticleContent {
                headline: headline.into(),
                body: body.into(),
                publication: publication.into(),
                ..Default::default()
            }),
        )
    }

    pub fn generic(
        name: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::with_content(
            name,
            Content::Generic(GenericContent {
                title: title.into(),
                body: body.into(),
                content_type: content_type.into(),
                ..Default::default()
            }),
        )
    }

    // -----------------------------------------------------------------------
    // Content refinements (no-ops on variants without the field)
    // -----------------------------------------------------------------------

    pub fn author(mut self, author: ContentAuthor) -> Self {
        match &mut self.content {
            Content::Thread(c) => {
                c.thread_data.author_name = author.identity;
                c.thread_data.author_alias = author.alias;
            }
            Content::ChatMessage(c) => c.author = author,
            Content::Email(c) => c.from = author,
            Content::SocialPost(c) => c.author = author,
            Content::NewsArticle(c) => c.author = author,
            Content::Generic(c) => c.author = author,
        }
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        match &mut self.content {
            Content::SocialPost(c) => c.tags.extend(tags),
            Content::NewsArticle(c) => c.tags.extend(tags),
            Content::Generic(c) => c.tags.extend(tags),
            _ => {}
        }
        self
    }

    pub fn images<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        match &mut self.content {
            Content::Thread(c) => c.thread_data.image_urls.extend(urls),
            Content::SocialPost(c) => c.image_urls.extend(urls),
            Content::NewsArticle(c) => c.image_urls.extend(urls),
            _ => {}
        }
        self
    }

    pub fn engagement(mut self, likes: u64, shares: u64, comments: u64) -> Self {
        if let Content::SocialPost(c) = &mut self.content {
            c.likes = likes;
            c.shares = shares;
            c.comments = comments;
        }
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        if let Content::Email(c) = &mut self.content {
            c.priority = priority.into();
        }
        self
    }

    pub fn recipient(mut self, recipient: ContentAuthor) -> Self {
        if let Content::Email(c) = &mut self.content {
            c.to.push(recipient);
        }
        self
    }

    pub fn chat_context(mut self, context: impl Into<String>) -> Self {
        if let Content::ChatMessage(c) = &mut self.content {
            c.chat_context = context.into();
        }
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        if let Content::NewsArticle(c) = &mut self.content {
            c.category = category.into();
        }
        self
    }

    pub fn reply(mut self, author: impl Into<String>, text: impl Into<String>) -> Self {
        if let Content::Thread(c) = &mut self.content {
            c.messages.push(ThreadMessage {
                author_name: author.into(),
                content: text.into(),
                ..Default::default()
            });
        }
        self
    }

    // -----------------------------------------------------------------------
    // Scenario-level fields
    // -----------------------------------------------------------------------

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn domain(self, domain: impl Into<String>) -> Self {
        self.context("domain", domain.into())
    }

    /// Add an expectation with the default priority and no rationale.
    pub fn expect_personality(
        self,
        personality: impl Into<String>,
        extensions: &[&str],
        should_show: bool,
        confidence: f64,
    ) -> Self {
        let outcome = ExpectationBuilder::new(personality, should_show, confidence)
            .extensions(extensions.iter().copied())
            .build();
        self.expectation(outcome)
    }

    pub fn expectation(mut self, outcome: PersonalityExpectedOutcome) -> Self {
        self.expectations.push(outcome);
        self
    }

    pub fn build(self) -> Scenario {
        Scenario {
            name: self.name,
            description: self.description,
            content: self.content,
            context: self.context,
            personality_expectations: self.expectations,
        }
    }
}

/// Builder for a single [`PersonalityExpectedOutcome`].
#[derive(Debug, Clone)]
pub struct ExpectationBuilder {
    outcome: PersonalityExpectedOutcome,
}

impl ExpectationBuilder {
    pub fn new(personality: impl Into<String>, should_show: bool, confidence: f64) -> Self {
        Self {
            outcome: PersonalityExpectedOutcome::new(personality, should_show, confidence),
        }
    }

    pub fn extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.outcome.extension_names.extend(names);
        self
    }

    pub fn state(mut self, state: VisibilityState) -> Self {
        self.outcome.expected_state = Some(state);
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.outcome.priority = priority.clamp(1, 3);
        self
    }

    pub fn rationale(mut self, rationale: impl Into<String>) -> Self {
        self.outcome.rationale = rationale.into();
        self
    }

    pub fn reason_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        self.outcome.reason_keywords.extend(keywords);
        self
    }

    pub fn build(self) -> PersonalityExpectedOutcome {
        self.outcome
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ScenarioType;

    #[test]
    fn test_email_builder() {
        let s = ScenarioBuilder::email("urgent_board", "Board prep", "Numbers due today", "cfo")
            .priority("urgent")
            .recipient(ContentAuthor::new("me"))
            .description("Urgent internal mail")
            .expect_personality("tech_entrepreneur", &[], true, 0.9)
            .build();
        assert_eq!(s.scenario_type(), ScenarioType::Email);
        assert_eq!(s.description, "Urgent internal mail");
        match &s.content {
            Content::Email(e) => {
                assert!(e.is_priority());
                assert_eq!(e.to.len(), 1);
            }
            other => panic!("unexpected content {:?}", other),
        }
        assert_eq!(s.personality_expectations.len(), 1);
    }

    #[test]
    fn test_refinements_ignore_other_variants() {
        let s = ScenarioBuilder::chat_message("hello", "hi there", "bob")
            .engagement(1, 2, 3)
            .priority("high")
            .tags(["x"])
            .build();
        assert_eq!(
            s.content,
            Content::ChatMessage(ChatMessageContent {
                content: "hi there".into(),
                author: ContentAuthor::new("bob"),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_thread_builder_with_replies() {
        let s = ScenarioBuilder::thread("t", "Title", "Body", "alice")
            .reply("bob", "great point")
            .images(["a.png"])
            .domain("technical_education")
            .build();
        assert_eq!(s.domain(), Some("technical_education"));
        assert_eq!(s.content.metadata()["message_count"], serde_json::json!(1));
        assert!(s.content.evaluation_text().contains("great point"));
    }

    #[test]
    fn test_expectation_builder() {
        let e = ExpectationBuilder::new("creative_artist", false, 0.8)
            .extensions(["ai_creative_applications", "creative_tools_focused"])
            .state(VisibilityState::Hidden)
            .priority(9)
            .rationale("Gossip is off-topic")
            .reason_keywords(["gossip"])
            .build();
        assert_eq!(e.extension_names.len(), 2);
        assert_eq!(e.priority, 3);
        assert_eq!(e.state(), VisibilityState::Hidden);
        assert_eq!(e.reason_keywords, vec!["gossip"]);
    }
}
