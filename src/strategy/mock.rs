//! Heuristic strategy with the extension bonus on top.

use async_trait::async_trait;

use super::bonus::ExtensionBonusTable;
use super::EvaluationStrategy;
use crate::error::Result;
use crate::evaluation::{EvaluationEnvironment, EvaluationHandler, EvaluationResult};
use crate::persona::ReferencePersonality;
use crate::scenario::Scenario;

#[derive(Debug, Clone, Default)]
pub struct MockStrategy {
    bonus: ExtensionBonusTable,
}

impl MockStrategy {
    pub fn new(bonus: ExtensionBonusTable) -> Self {
        Self { bonus }
    }

    pub fn bonus_table(&self) -> &ExtensionBonusTable {
        &self.bonus
    }
}

#[async_trait]
impl EvaluationStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn evaluate(
        &self,
        handler: &dyn EvaluationHandler,
        scenario: &Scenario,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let result = handler.assess(&scenario.content, personality, env)?;
        let text = scenario.content.evaluation_text();
        Ok(self
            .bonus
            .apply(result, &personality.extension_names, &text)
            .with_metadata("strategy", self.name()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{EmailHandler, NewsArticleHandler, SocialPostHandler, ThreadHandler};
    use crate::scenario::ScenarioBuilder;

    fn tech(extensions: &[&str]) -> ReferencePersonality {
        ReferencePersonality {
            name: "tech_entrepreneur".into(),
            base_name: "tech_entrepreneur".into(),
            extension_names: extensions.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_mock_without_extensions_matches_handler() {
        let scenario =
            ScenarioBuilder::news_article("n", "AI startup raises Series A", "", "Daily").build();
        let env = EvaluationEnvironment::default();
        let direct = NewsArticleHandler
            .assess(&scenario.content, &tech(&[]), &env)
            .unwrap();
        let via_mock = MockStrategy::default()
            .evaluate(&NewsArticleHandler, &scenario, &tech(&[]), &env)
            .await
            .unwrap();
        assert_eq!(via_mock.confidence, direct.confidence);
        assert_eq!(via_mock.reason, direct.reason);
        assert_eq!(via_mock.metadata["strategy"], "mock");
    }

    #[tokio::test]
    async fn test_mock_applies_bonus_with_ceiling() {
        let scenario =
            ScenarioBuilder::news_article("n", "AI startup raises Series A", "", "Daily").build();
        let personality = tech(&["ai_research_focused", "startup_ecosystem_focused"]);
        let r = MockStrategy::default()
            .evaluate(
                &NewsArticleHandler,
                &scenario,
                &personality,
                &EvaluationEnvironment::default(),
            )
            .await
            .unwrap();
        assert!(r.should_show);
        assert_eq!(r.confidence, 0.98);
        assert!(r.reason.ends_with(
            "(with 2 extensions: [ai_research_focused, startup_ecosystem_focused])"
        ));
    }

    #[tokio::test]
    async fn test_ceiling_holds_without_extensions() {
        let env = EvaluationEnvironment::default();
        let email = ScenarioBuilder::email(
            "e",
            "AI startup funding",
            "Series A investment terms attached",
            "partner",
        )
        .priority("urgent")
        .build();
        let direct = EmailHandler.assess(&email.content, &tech(&[]), &env).unwrap();
        assert_eq!(direct.confidence, 1.0);

        let base = MockStrategy::default()
            .evaluate(&EmailHandler, &email, &tech(&[]), &env)
            .await
            .unwrap();
        let extended = MockStrategy::default()
            .evaluate(&EmailHandler, &email, &tech(&["unrelated_ext"]), &env)
            .await
            .unwrap();
        assert_eq!(base.confidence, 0.98);
        assert!(extended.confidence >= base.confidence);

        let post = ScenarioBuilder::social_post("p", "startup life", "linkedin")
            .engagement(50_000, 0, 0)
            .build();
        let r = MockStrategy::default()
            .evaluate(&SocialPostHandler, &post, &tech(&[]), &env)
            .await
            .unwrap();
        assert!(r.confidence <= 0.98);
    }

    #[tokio::test]
    async fn test_mock_propagates_handler_errors() {
        let scenario = ScenarioBuilder::email("e", "Hi", "there", "x").build();
        let err = MockStrategy::default()
            .evaluate(&ThreadHandler, &scenario, &tech(&[]), &EvaluationEnvironment::default())
            .await
            .unwrap_err();
        assert!(err.is_case_local());
    }
}
