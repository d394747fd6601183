//! One handler per content variant.
//!
//! All six share the cascade in [`heuristics`](super::heuristics); each
//! contributes its variant-specific signals and metadata on top.

use serde_json::json;

use super::heuristics::{run_cascade, CascadeRule, InterestProfile, Signals};
use super::{EvaluationEnvironment, EvaluationHandler, EvaluationResult};
use crate::content::{Content, ScenarioType};
use crate::error::{HarnessError, Result};
use crate::persona::ReferencePersonality;

/// Engagement total that earns the full boost.
const ENGAGEMENT_SATURATION: f64 = 10_000.0;
const MAX_ENGAGEMENT_BOOST: f64 = 0.1;

fn mismatch(expected: ScenarioType, content: &Content) -> HarnessError {
    HarnessError::ContentMismatch {
        expected,
        actual: content.content_type(),
    }
}

fn cascade(
    content: &Content,
    personality: &ReferencePersonality,
    env: &EvaluationEnvironment,
) -> EvaluationResult {
    let text = content.evaluation_text();
    let profile = InterestProfile::for_personality(personality);
    run_cascade(profile, personality, &Signals::new(&text, env.domain()))
}

/// Log-scaled engagement bonus in `[0, 0.1]`.
pub fn engagement_boost(total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let scaled = (1.0 + total as f64).ln() / (1.0 + ENGAGEMENT_SATURATION).ln();
    MAX_ENGAGEMENT_BOOST * scaled.min(1.0)
}

// ============================================================================
// Thread
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadHandler;

impl EvaluationHandler for ThreadHandler {
    fn supported_type(&self) -> ScenarioType {
        ScenarioType::Thread
    }

    fn assess(
        &self,
        content: &Content,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let Content::Thread(thread) = content else {
            return Err(mismatch(self.supported_type(), content));
        };
        Ok(cascade(content, personality, env)
            .with_metadata("title", thread.title())
            .with_metadata("message_count", thread.messages.len())
            .with_metadata("image_count", thread.image_urls().len()))
    }
}

// ============================================================================
// Chat message
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatMessageHandler;

impl EvaluationHandler for ChatMessageHandler {
    fn supported_type(&self) -> ScenarioType {
        ScenarioType::ChatMessage
    }

    fn assess(
        &self,
        content: &Content,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let Content::ChatMessage(chat) = content else {
            return Err(mismatch(self.supported_type(), content));
        };
        Ok(cascade(content, personality, env)
            .with_metadata("chat_context", chat.chat_context.as_str())
            .with_metadata("author", chat.author.display_name()))
    }
}

// ============================================================================
// Email
// ============================================================================

/// Urgent mail is always shown; confidence grows with interest matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailHandler;

impl EvaluationHandler for EmailHandler {
    fn supported_type(&self) -> ScenarioType {
        ScenarioType::Email
    }

    fn assess(
        &self,
        content: &Content,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let Content::Email(email) = content else {
            return Err(mismatch(self.supported_type(), content));
        };

        let result = if email.is_priority() {
            let text = content.evaluation_text();
            let profile = InterestProfile::for_personality(personality);
            let matched = profile.interest_matches(&text, personality);
            let confidence = (0.8 + 0.1 * matched.len() as f64).min(1.0);
            log::debug!(
                "Priority email for {}: {} interest matches",
                personality.name,
                matched.len()
            );
            EvaluationResult::accept(
                confidence,
                format!(
                    "{} priority email for {}",
                    crate::content::text::capitalize(&email.priority.to_lowercase()),
                    personality.name
                ),
            )
            .with_metadata("rule", CascadeRule::PriorityOverride.as_str())
            .with_metadata("archetype", profile.archetype.as_str())
            .with_metadata("matched_keywords", json!(matched))
        } else {
            cascade(content, personality, env)
        };

        Ok(result
            .with_metadata("subject", email.subject.as_str())
            .with_metadata("priority", email.priority.as_str())
            .with_metadata("from", email.from.display_name()))
    }
}

// ============================================================================
// Social post
// ============================================================================

/// Platform affinity counts as an interest match; engagement lifts the
/// confidence of accepted posts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialPostHandler;

impl EvaluationHandler for SocialPostHandler {
    fn supported_type(&self) -> ScenarioType {
        ScenarioType::SocialPost
    }

    fn assess(
        &self,
        content: &Content,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let Content::SocialPost(post) = content else {
            return Err(mismatch(self.supported_type(), content));
        };

        let text = content.evaluation_text();
        let profile = InterestProfile::for_personality(personality);
        let mut signals = Signals::new(&text, env.domain());
        if profile.platform_affinity(&post.platform, !post.image_urls.is_empty(), &text) {
            signals = signals.with_extra_match(format!("platform:{}", post.platform.to_lowercase()));
        }

        let mut result = run_cascade(profile, personality, &signals);
        let engagement = post.total_engagement();
        if result.should_show {
            let boost = engagement_boost(engagement);
            let confidence = result.confidence + boost;
            result = result
                .with_confidence(confidence)
                .with_metadata("engagement_boost", boost);
        }

        Ok(result
            .with_metadata("platform", post.platform.as_str())
            .with_metadata("engagement", engagement)
            .with_metadata("image_count", post.image_urls.len()))
    }
}

// ============================================================================
// News article
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct NewsArticleHandler;

impl EvaluationHandler for NewsArticleHandler {
    fn supported_type(&self) -> ScenarioType {
        ScenarioType::NewsArticle
    }

    fn assess(
        &self,
        content: &Content,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let Content::NewsArticle(article) = content else {
            return Err(mismatch(self.supported_type(), content));
        };
        Ok(cascade(content, personality, env)
            .with_metadata("publication", article.publication.as_str())
            .with_metadata("category", article.category.as_str()))
    }
}

// ============================================================================
// Generic
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericHandler;

impl EvaluationHandler for GenericHandler {
    fn supported_type(&self) -> ScenarioType {
        ScenarioType::Generic
    }

    fn assess(
        &self,
        content: &Content,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let Content::Generic(generic) = content else {
            return Err(mismatch(self.supported_type(), content));
        };
        Ok(cascade(content, personality, env)
            .with_metadata("content_type", generic.content_type.as_str()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::content::ContentAuthor;
    use crate::evaluation::VisibilityState;
    use crate::persona::PersonalityProfile;
    use crate::scenario::ScenarioBuilder;
    use serde_json::{Map, Value};

    fn personality(base: &str, interests: &[&str]) -> ReferencePersonality {
        ReferencePersonality {
            name: base.into(),
            base_name: base.into(),
            profile: PersonalityProfile {
                interests: interests.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn env(domain: Option<&str>) -> EvaluationEnvironment {
        let mut ctx = Map::new();
        if let Some(domain) = domain {
            ctx.insert("domain".into(), Value::from(domain));
        }
        EvaluationEnvironment::new(ctx, CancellationToken::new())
    }

    #[test]
    fn test_thread_strong_interest() {
        let s = ScenarioBuilder::thread("t", "AI startup demo day", "Pitches all afternoon", "ana")
            .reply("ben", "see you there")
            .build();
        let r = ThreadHandler
            .assess(&s.content, &personality("tech_entrepreneur", &[]), &env(None))
            .unwrap();
        assert!(r.should_show);
        assert_eq!(r.confidence, 0.95);
        assert_eq!(r.new_state, VisibilityState::Visible);
        assert_eq!(r.metadata["rule"], "strong_interest");
        assert_eq!(r.metadata["message_count"], json!(1));
    }

    #[test]
    fn test_wrong_variant_is_content_mismatch() {
        let s = ScenarioBuilder::chat_message("c", "hello", "bob").build();
        let err = ThreadHandler
            .assess(&s.content, &personality("tech_entrepreneur", &[]), &env(None))
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ContentMismatch {
                expected: ScenarioType::Thread,
                actual: ScenarioType::ChatMessage
            }
        ));
    }

    #[test]
    fn test_chat_too_short_for_general() {
        let s = ScenarioBuilder::chat_message("c", "ok see you soon", "bob")
            .chat_context("family")
            .build();
        let r = ChatMessageHandler
            .assess(&s.content, &personality("gardener", &[]), &env(None))
            .unwrap();
        assert!(!r.should_show);
        assert_eq!(r.confidence, 0.9);
        assert_eq!(r.metadata["rule"], "too_short");
        assert_eq!(r.metadata["chat_context"], "family");
    }

    #[test]
    fn test_email_priority_override() {
        let s = ScenarioBuilder::email("e", "Board meeting", "Funding review tomorrow", "cfo")
            .priority("URGENT")
            .build();
        let r = EmailHandler
            .assess(&s.content, &personality("tech_entrepreneur", &[]), &env(None))
            .unwrap();
        assert!(r.should_show);
        assert!((r.confidence - 0.9).abs() < 1e-9);
        assert_eq!(r.metadata["rule"], "priority_override");
        assert_eq!(r.metadata["priority"], "URGENT");
    }

    #[test]
    fn test_email_priority_beats_spam() {
        let s = ScenarioBuilder::email("e", "Act now", "Click here", "promo")
            .priority("high")
            .build();
        let r = EmailHandler
            .assess(&s.content, &personality("gardener", &[]), &env(None))
            .unwrap();
        assert!(r.should_show);
        assert!((r.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_email_without_priority_runs_cascade() {
        let s = ScenarioBuilder::email("e", "Board meeting", "Funding review tomorrow", "cfo")
            .priority("normal")
            .build();
        let r = EmailHandler
            .assess(&s.content, &personality("tech_entrepreneur", &[]), &env(None))
            .unwrap();
        assert_eq!(r.metadata["rule"], "single_interest");
        assert_eq!(r.confidence, 0.8);
    }

    #[test]
    fn test_social_image_post_on_visual_platform() {
        let creative = personality("creative_artist", &[]);
        let with_images = ScenarioBuilder::social_post("p", "sunset over the bay", "Instagram")
            .images(["https://example.com/sunset.png"])
            .build();
        let r = SocialPostHandler
            .assess(&with_images.content, &creative, &env(None))
            .unwrap();
        assert!(r.should_show);
        assert_eq!(r.confidence, 0.85);
        assert_eq!(r.metadata["matched_keywords"], json!(["platform:instagram"]));

        let without = ScenarioBuilder::social_post("p", "sunset over the bay", "instagram").build();
        let r = SocialPostHandler
            .assess(&without.content, &creative, &env(None))
            .unwrap();
        assert!(!r.should_show);
        assert_eq!(r.metadata["rule"], "too_short");
    }

    #[test]
    fn test_social_engagement_boost() {
        let s = ScenarioBuilder::social_post("p", "sunset over the bay", "instagram")
            .images(["a.png"])
            .engagement(9_000, 500, 499)
            .author(ContentAuthor::new("lee"))
            .build();
        let r = SocialPostHandler
            .assess(&s.content, &personality("creative_artist", &[]), &env(None))
            .unwrap();
        assert!(r.confidence > 0.94 && r.confidence < 0.951);
        assert_eq!(r.metadata["engagement"], json!(9_999));
    }

    #[test]
    fn test_social_confidence_stays_in_range() {
        let s = ScenarioBuilder::social_post("p", "startup life", "twitter")
            .engagement(50_000, 0, 0)
            .build();
        let r = SocialPostHandler
            .assess(&s.content, &personality("tech_entrepreneur", &[]), &env(None))
            .unwrap();
        assert_eq!(r.metadata["rule"], "strong_interest");
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn test_engagement_boost_curve() {
        assert_eq!(engagement_boost(0), 0.0);
        assert!((engagement_boost(10_000) - 0.1).abs() < 1e-12);
        assert_eq!(engagement_boost(1_000_000), 0.1);
        assert!(engagement_boost(10) < engagement_boost(100));
    }

    #[test]
    fn test_news_quality_keywords_for_general() {
        let s = ScenarioBuilder::news_article("n", "Detailed study of soil", "", "Gazette")
            .category("science")
            .build();
        let r = NewsArticleHandler
            .assess(&s.content, &personality("gardener", &[]), &env(None))
            .unwrap();
        assert!(r.should_show);
        assert_eq!(r.metadata["publication"], "Gazette");
        assert_eq!(r.metadata["category"], "science");
    }

    #[test]
    fn test_generic_domain_override() {
        let s = ScenarioBuilder::generic("g", "Who wore it", "best", "blog").build();
        let r = GenericHandler
            .assess(
                &s.content,
                &personality("tech_entrepreneur", &[]),
                &env(Some("entertainment_gossip")),
            )
            .unwrap();
        assert!(!r.should_show);
        assert_eq!(r.confidence, 0.9);
        assert_eq!(r.metadata["rule"], "domain_override");
        assert_eq!(r.metadata["content_type"], "blog");
    }

    #[test]
    fn test_generic_tags_count_as_text() {
        let s = ScenarioBuilder::generic("g", "Weekend plans", "", "note")
            .tags(["compost"])
            .build();
        let r = GenericHandler
            .assess(&s.content, &personality("gardener", &["compost"]), &env(None))
            .unwrap();
        assert!(r.should_show);
        assert_eq!(r.metadata["rule"], "single_interest");
    }
}
