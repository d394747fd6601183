//! Content model: the closed set of things a personality can be shown.
//!
//! Every variant answers the same read-only questions (main text, author,
//! creation time, metadata, display title/summary, keywords) through
//! [`Content`]. Decoding always goes through [`Content::from_tagged`], which
//! picks the variant from an explicit type tag so an unknown tag fails
//! instead of silently landing in the wrong variant.

pub mod text;
pub mod types;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{HarnessError, Result};

pub use types::{
    ChatMessageContent, EmailContent, GenericContent, NewsArticleContent, SocialPostContent,
    ThreadAuthor, ThreadContent, ThreadData, ThreadMessage, ThreadRecord,
};

// ============================================================================
// ScenarioType
// ============================================================================

/// Content type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    Thread,
    ChatMessage,
    Email,
    SocialPost,
    NewsArticle,
    Generic,
}

impl ScenarioType {
    pub const ALL: [ScenarioType; 6] = [
        ScenarioType::Thread,
        ScenarioType::ChatMessage,
        ScenarioType::Email,
        ScenarioType::SocialPost,
        ScenarioType::NewsArticle,
        ScenarioType::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::ChatMessage => "chat_message",
            Self::Email => "email",
            Self::SocialPost => "social_post",
            Self::NewsArticle => "news_article",
            Self::Generic => "generic",
        }
    }

    /// Display-summary cutoff in characters.
    pub fn summary_cutoff(&self) -> usize {
        match self {
            Self::Thread => 150,
            Self::ChatMessage => 100,
            Self::Email => 150,
            Self::SocialPost => 120,
            Self::NewsArticle => 200,
            Self::Generic => 150,
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioType {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        ScenarioType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HarnessError::UnsupportedType(s.to_string()))
    }
}

// ============================================================================
// ContentAuthor
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentAuthor {
    #[serde(default)]
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ContentAuthor {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    /// Best human-readable label: name, then alias, then identity.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.alias.as_deref())
            .unwrap_or(&self.identity)
    }
}

// ============================================================================
// Content
// ============================================================================

/// One piece of content. Serializes as the bare variant payload; the tag
/// travels next to it in the enclosing scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Thread(ThreadContent),
    ChatMessage(ChatMessageContent),
    Email(EmailContent),
    SocialPost(SocialPostContent),
    NewsArticle(NewsArticleContent),
    Generic(GenericContent),
}

impl Content {
    /// Decode `payload` as the variant named by `tag`.
    pub fn from_tagged(tag: &str, payload: Value) -> Result<Self> {
        let ty: ScenarioType = tag.parse()?;
        Self::decode(ty, payload)
    }

    pub fn decode(ty: ScenarioType, payload: Value) -> Result<Self> {
        let content = match ty {
            ScenarioType::Thread => Content::Thread(serde_json::from_value(payload)?),
            ScenarioType::ChatMessage => Content::ChatMessage(serde_json::from_value(payload)?),
            ScenarioType::Email => Content::Email(serde_json::from_value(payload)?),
            ScenarioType::SocialPost => Content::SocialPost(serde_json::from_value(payload)?),
            ScenarioType::NewsArticle => Content::NewsArticle(serde_json::from_value(payload)?),
            ScenarioType::Generic => Content::Generic(serde_json::from_value(payload)?),
        };
        Ok(content)
    }

    pub fn content_type(&self) -> ScenarioType {
        match self {
            Content::Thread(_) => ScenarioType::Thread,
            Content::ChatMessage(_) => ScenarioType::ChatMessage,
            Content::Email(_) => ScenarioType::Email,
            Content::SocialPost(_) => ScenarioType::SocialPost,
            Content::NewsArticle(_) => ScenarioType::NewsArticle,
            Content::Generic(_) => ScenarioType::Generic,
        }
    }

    pub fn main_text(&self) -> &str {
        match self {
            Content::Thread(c) => c.body(),
            Content::ChatMessage(c) => c.message_text(),
            Content::Email(c) => c.body.as_str(),
            Content::SocialPost(c) => c.text.as_str(),
            Content::NewsArticle(c) => c.body.as_str(),
            Content::Generic(c) => c.body.as_str(),
        }
    }

    pub fn author(&self) -> ContentAuthor {
        match self {
            Content::Thread(c) => c.author(),
            Content::ChatMessage(c) => c.author.clone(),
            Content::Email(c) => c.from.clone(),
            Content::SocialPost(c) => c.author.clone(),
            Content::NewsArticle(c) => c.author.clone(),
            Content::Generic(c) => c.author.clone(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Content::Thread(c) => c.created_at(),
            Content::ChatMessage(c) => c.created_at,
            Content::Email(c) => c.created_at,
            Content::SocialPost(c) => c.created_at,
            Content::NewsArticle(c) => c.created_at,
            Content::Generic(c) => c.created_at,
        }
    }

    /// Variant-specific fields merged over the payload's own metadata map.
    pub fn metadata(&self) -> Map<String, Value> {
        let (mut base, extra) = match self {
            Content::Thread(c) => {
                let mut extra = Map::new();
                if let Some(record) = &c.thread {
                    extra.insert("thread_id".into(), json!(record.id));
                    extra.insert("actions".into(), json!(record.actions));
                }
                extra.insert("title".into(), json!(c.title()));
                extra.insert("image_urls".into(), json!(c.image_urls()));
                extra.insert("message_count".into(), json!(c.messages.len()));
                (Map::new(), extra)
            }
            Content::ChatMessage(c) => {
                let extra = Map::from_iter([
                    ("message_id".to_string(), json!(c.message_id)),
                    ("chat_context".to_string(), json!(c.chat_context)),
                ]);
                (c.metadata.clone(), extra)
            }
            Content::Email(c) => {
                let extra = Map::from_iter([
                    ("subject".to_string(), json!(c.subject)),
                    ("priority".to_string(), json!(c.priority)),
                    ("recipient_count".to_string(), json!(c.to.len())),
                    ("cc_count".to_string(), json!(c.cc.len())),
                ]);
                (c.metadata.clone(), extra)
            }
            Content::SocialPost(c) => {
                let extra = Map::from_iter([
                    ("post_id".to_string(), json!(c.post_id)),
                    ("platform".to_string(), json!(c.platform)),
                    ("likes".to_string(), json!(c.likes)),
                    ("shares".to_string(), json!(c.shares)),
                    ("comments".to_string(), json!(c.comments)),
                    ("total_engagement".to_string(), json!(c.total_engagement())),
                    ("image_count".to_string(), json!(c.image_urls.len())),
                    ("tags".to_string(), json!(c.tags)),
                ]);
                (c.metadata.clone(), extra)
            }
            Content::NewsArticle(c) => {
                let extra = Map::from_iter([
                    ("article_id".to_string(), json!(c.article_id)),
                    ("publication".to_string(), json!(c.publication)),
                    ("category".to_string(), json!(c.category)),
                    ("tags".to_string(), json!(c.tags)),
                ]);
                (c.metadata.clone(), extra)
            }
            Content::Generic(c) => {
                let extra = Map::from_iter([
                    ("content_id".to_string(), json!(c.content_id)),
                    ("content_type".to_string(), json!(c.content_type)),
                    ("tags".to_string(), json!(c.tags)),
                ]);
                (c.metadata.clone(), extra)
            }
        };
        base.extend(extra);
        base
    }

    pub fn display_title(&self) -> String {
        match self {
            Content::Thread(c) => c.title().to_string(),
            Content::ChatMessage(c) if !c.chat_context.is_empty() => {
                format!("Message in {}", c.chat_context)
            }
            Content::ChatMessage(_) => "Chat Message".to_string(),
            Content::Email(c) => c.subject.clone(),
            Content::SocialPost(c) => format!("{} Post", text::capitalize(&c.platform)),
            Content::NewsArticle(c) => c.headline.clone(),
            Content::Generic(c) => c.title.clone(),
        }
    }

    pub fn display_summary(&self) -> String {
        text::truncate(self.main_text(), self.content_type().summary_cutoff())
    }

    /// Frequency-filtered keywords; tags are always included for the
    /// tag-bearing variants.
    pub fn keywords(&self) -> Vec<String> {
        match self {
            Content::Thread(c) => text::extract_keywords(&format!("{} {}", c.title(), c.body())),
            Content::ChatMessage(c) => text::extract_keywords(c.message_text()),
            Content::Email(c) => text::extract_keywords(&format!("{} {}", c.subject, c.body)),
            Content::SocialPost(c) => text::merge_keywords(text::extract_keywords(&c.text), &c.tags),
            Content::NewsArticle(c) => text::merge_keywords(
                text::extract_keywords(&format!("{} {}", c.headline, c.body)),
                &c.tags,
            ),
            Content::Generic(c) => text::merge_keywords(
                text::extract_keywords(&format!("{} {}", c.title, c.body)),
                &c.tags,
            ),
        }
    }

    /// Everything a handler matches keywords against, case-folded.
    pub fn evaluation_text(&self) -> String {
        let parts: Vec<&str> = match self {
            Content::Thread(c) => {
                let mut parts = vec![c.title(), c.body()];
                parts.extend(c.messages.iter().map(|m| m.content.as_str()));
                parts
            }
            Content::ChatMessage(c) => vec![c.message_text()],
            Content::Email(c) => vec![c.subject.as_str(), c.body.as_str()],
            Content::SocialPost(c) => {
                let mut parts = vec![c.text.as_str()];
                parts.extend(c.tags.iter().map(String::as_str));
                parts
            }
            Content::NewsArticle(c) => {
                let mut parts = vec![c.headline.as_str(), c.body.as_str(), c.category.as_str()];
                parts.extend(c.tags.iter().map(String::as_str));
                parts
            }
            Content::Generic(c) => {
                let mut parts = vec![c.title.as_str(), c.body.as_str()];
                parts.extend(c.tags.iter().map(String::as_str));
                parts
            }
        };
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_type_round_trip_tags() {
        for ty in ScenarioType::ALL {
            assert_eq!(ty.as_str().parse::<ScenarioType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = Content::from_tagged("podcast", json!({})).unwrap_err();
        assert!(matches!(err, HarnessError::UnsupportedType(t) if t == "podcast"));
    }

    #[test]
    fn test_decode_email_by_tag() {
        let content = Content::from_tagged(
            "email",
            json!({
                "subject": "Board meeting",
                "body": "Agenda attached",
                "from": {"identity": "ceo@example.com", "name": "Dana"},
                "to": [{"identity": "me@example.com"}],
                "priority": "urgent"
            }),
        )
        .unwrap();
        assert_eq!(content.content_type(), ScenarioType::Email);
        assert_eq!(content.display_title(), "Board meeting");
        assert_eq!(content.author().display_name(), "Dana");
        let meta = content.metadata();
        assert_eq!(meta["priority"], json!("urgent"));
        assert_eq!(meta["recipient_count"], json!(1));
    }

    #[test]
    fn test_thread_prefers_record_over_data() {
        let content = Content::from_tagged(
            "thread",
            json!({
                "thread": {
                    "id": "t-1",
                    "title": "Record title",
                    "content": "Record body",
                    "author": {"identity": "alice", "alias": "ali"},
                    "createdAt": "2025-01-02T03:04:05Z"
                },
                "thread_data": {"title": "Data title", "content": "Data body", "author_name": "bob"}
            }),
        )
        .unwrap();
        assert_eq!(content.display_title(), "Record title");
        assert_eq!(content.main_text(), "Record body");
        assert_eq!(content.author().identity, "alice");
        assert!(content.created_at().is_some());
        assert_eq!(content.metadata()["thread_id"], json!("t-1"));
    }

    #[test]
    fn test_thread_data_fallback() {
        let content = Content::from_tagged(
            "thread",
            json!({"thread_data": {"title": "Hello", "content": "World", "author_name": "bob"}}),
        )
        .unwrap();
        assert_eq!(content.display_title(), "Hello");
        assert_eq!(content.author().identity, "bob");
        assert!(content.created_at().is_none());
    }

    #[test]
    fn test_chat_prefers_text_field() {
        let chat = Content::ChatMessage(ChatMessageContent {
            content: "new field".into(),
            text: "legacy field".into(),
            chat_context: "founders".into(),
            ..Default::default()
        });
        assert_eq!(chat.main_text(), "legacy field");
        assert_eq!(chat.display_title(), "Message in founders");
    }

    #[test]
    fn test_social_display_title_and_tags_in_keywords() {
        let post = Content::SocialPost(SocialPostContent {
            text: "Short post".into(),
            platform: "instagram".into(),
            tags: vec!["DigitalArt".into()],
            ..Default::default()
        });
        assert_eq!(post.display_title(), "Instagram Post");
        assert!(post.keywords().contains(&"digitalart".to_string()));
    }

    #[test]
    fn test_summary_cutoffs_per_variant() {
        let long = "x".repeat(500);
        let cases = [
            (Content::ChatMessage(ChatMessageContent { content: long.clone(), ..Default::default() }), 100),
            (Content::SocialPost(SocialPostContent { text: long.clone(), ..Default::default() }), 120),
            (Content::NewsArticle(NewsArticleContent { body: long.clone(), ..Default::default() }), 200),
            (Content::Generic(GenericContent { body: long.clone(), ..Default::default() }), 150),
        ];
        for (content, cutoff) in cases {
            let summary = content.display_summary();
            assert_eq!(summary.chars().count(), cutoff);
            assert!(summary.ends_with("..."));
        }
    }

    #[test]
    fn test_evaluation_text_is_case_folded() {
        let news = Content::NewsArticle(NewsArticleContent {
            headline: "AI Funding".into(),
            body: "Series B".into(),
            category: "Technology".into(),
            tags: vec!["Venture".into()],
            ..Default::default()
        });
        assert_eq!(news.evaluation_text(), "ai funding series b technology venture");
    }
}
