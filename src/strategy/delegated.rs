//! Delegated strategy: ask a completion provider, then recover a result
//! from its free-text reply.
//!
//! Reply recovery takes everything from the first `{` to the last `}` and
//! parses it as one JSON object. This is best-effort: a reply with a stray
//! `}` after the real object, or prose braces around it, fails to parse.
//! Missing fields get defaults instead of failing the case.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::prompt::PromptTemplate;
use super::EvaluationStrategy;
use crate::error::{HarnessError, Result};
use crate::evaluation::{
    EvaluationEnvironment, EvaluationHandler, EvaluationResult, VisibilityState,
};
use crate::llms::CompletionProvider;
use crate::persona::ReferencePersonality;
use crate::scenario::Scenario;

/// Greedy, so it spans the first `{` to the last `}`.
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

pub const DEFAULT_REASON: &str = "Delegated evaluation completed";

#[derive(Debug, Clone)]
pub struct DelegatedStrategy {
    provider: Arc<dyn CompletionProvider>,
    template: PromptTemplate,
}

impl DelegatedStrategy {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    async fn call_provider(&self, prompt: &str, env: &EvaluationEnvironment) -> Result<String> {
        let call = self.provider.complete(prompt);
        match env.deadline {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .map_err(|_| {
                    HarnessError::EvaluationUnavailable(format!(
                        "completion timed out after {:?}",
                        deadline
                    ))
                })?
                .map_err(HarnessError::from),
            None => call.await.map_err(HarnessError::from),
        }
    }
}

#[async_trait]
impl EvaluationStrategy for DelegatedStrategy {
    fn name(&self) -> &'static str {
        "delegated"
    }

    async fn evaluate(
        &self,
        handler: &dyn EvaluationHandler,
        scenario: &Scenario,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        if env.cancel.is_cancelled() {
            return Err(HarnessError::Cancelled);
        }

        let prompt = self.template.render(personality, scenario)?;
        log::debug!(
            "Delegated evaluation of '{}' for {} via {} (prompt {} chars)",
            scenario.name,
            personality.name,
            self.provider.model(),
            prompt.chars().count()
        );

        let reply = tokio::select! {
            _ = env.cancel.cancelled() => return Err(HarnessError::Cancelled),
            reply = self.call_provider(&prompt, env) => reply?,
        };

        let result = parse_evaluation_reply(&reply)?;
        Ok(result
            .with_metadata("strategy", self.name())
            .with_metadata("handler", handler.supported_type().as_str())
            .with_metadata("model", self.provider.model()))
    }
}

/// Recover an [`EvaluationResult`] from a free-text reply.
///
/// Fails with `EvaluationUnavailable` when the reply has no brace span or
/// the span is not a JSON object.
pub fn parse_evaluation_reply(reply: &str) -> Result<EvaluationResult> {
    let span = JSON_OBJECT.find(reply).ok_or_else(|| {
        HarnessError::EvaluationUnavailable("no JSON object found in reply".to_string())
    })?;

    let value: Value = serde_json::from_str(span.as_str()).map_err(|e| {
        HarnessError::EvaluationUnavailable(format!("reply JSON did not parse: {}", e))
    })?;
    let object = value.as_object().ok_or_else(|| {
        HarnessError::EvaluationUnavailable("reply JSON is not an object".to_string())
    })?;

    let should_show = object
        .get("should_show")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(DEFAULT_REASON);

    if let Some(raw) = object.get("new_state").and_then(Value::as_str) {
        let derived = VisibilityState::from_should_show(should_show);
        match raw.parse::<VisibilityState>() {
            Ok(state) if state == derived => {}
            Ok(state) => log::warn!(
                "Delegated reply has new_state '{}' but should_show={}; using '{}'",
                state,
                should_show,
                derived
            ),
            Err(e) => log::warn!("Ignoring delegated new_state: {}", e),
        }
    }

    Ok(EvaluationResult::new(should_show, confidence, reason))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::evaluation::ChatMessageHandler;
    use crate::llms::CompletionError;
    use crate::scenario::ScenarioBuilder;
    use std::time::Duration;

    #[derive(Debug)]
    struct Canned(&'static str);

    #[async_trait]
    impl CompletionProvider for Canned {
        fn model(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _prompt: &str) -> std::result::Result<String, CompletionError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl CompletionProvider for Failing {
        fn model(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _prompt: &str) -> std::result::Result<String, CompletionError> {
            Err(CompletionError::Status {
                status: 503,
                body: "overloaded".into(),
            })
        }
    }

    /// Never answers.
    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl CompletionProvider for Stalled {
        fn model(&self) -> &str {
            "stalled"
        }

        async fn complete(&self, _prompt: &str) -> std::result::Result<String, CompletionError> {
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    fn personality() -> ReferencePersonality {
        ReferencePersonality {
            name: "creative_artist".into(),
            base_name: "creative_artist".into(),
            ..Default::default()
        }
    }

    fn scenario() -> Scenario {
        ScenarioBuilder::chat_message("c", "look at this painting", "kim").build()
    }

    #[test]
    fn test_parse_recovers_embedded_object() {
        let r = parse_evaluation_reply("Sure! {\"should_show\": true, \"confidence\": 1.4}").unwrap();
        assert!(r.should_show);
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.new_state, VisibilityState::Visible);
        assert_eq!(r.reason, DEFAULT_REASON);
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let r = parse_evaluation_reply("{}").unwrap();
        assert!(!r.should_show);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.new_state, VisibilityState::Hidden);
    }

    #[test]
    fn test_parse_inconsistent_state_is_derived() {
        let r = parse_evaluation_reply(
            "{\"should_show\": false, \"confidence\": 0.7, \"reason\": \"meh\", \"new_state\": \"visible\"}",
        )
        .unwrap();
        assert_eq!(r.new_state, VisibilityState::Hidden);
        assert_eq!(r.reason, "meh");
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            parse_evaluation_reply("I cannot decide."),
            Err(HarnessError::EvaluationUnavailable(_))
        ));
        assert!(matches!(
            parse_evaluation_reply("{not json}"),
            Err(HarnessError::EvaluationUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_spans_first_to_last_brace() {
        // Trailing prose with a brace breaks recovery.
        assert!(parse_evaluation_reply("{\"should_show\": true} and {oops}").is_err());
    }

    #[tokio::test]
    async fn test_delegated_evaluate() {
        let strategy = DelegatedStrategy::new(Arc::new(Canned(
            "Here you go:\n{\"should_show\": true, \"confidence\": 0.82, \"reason\": \"Loves painting\", \"new_state\": \"visible\"}",
        )));
        let r = strategy
            .evaluate(
                &ChatMessageHandler,
                &scenario(),
                &personality(),
                &EvaluationEnvironment::default(),
            )
            .await
            .unwrap();
        assert!(r.should_show);
        assert_eq!(r.confidence, 0.82);
        assert_eq!(r.reason, "Loves painting");
        assert_eq!(r.metadata["strategy"], "delegated");
        assert_eq!(r.metadata["handler"], "chat_message");
    }

    #[tokio::test]
    async fn test_provider_error_is_unavailable() {
        let strategy = DelegatedStrategy::new(Arc::new(Failing));
        let err = strategy
            .evaluate(
                &ChatMessageHandler,
                &scenario(),
                &personality(),
                &EvaluationEnvironment::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::EvaluationUnavailable(m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_deadline_is_unavailable() {
        let strategy = DelegatedStrategy::new(Arc::new(Stalled));
        let env = EvaluationEnvironment::default().with_deadline(Some(Duration::from_millis(20)));
        let err = strategy
            .evaluate(&ChatMessageHandler, &scenario(), &personality(), &env)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::EvaluationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_call() {
        let strategy = DelegatedStrategy::new(Arc::new(Stalled));
        let token = CancellationToken::new();
        let env = EvaluationEnvironment::new(Default::default(), token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let err = strategy
            .evaluate(&ChatMessageHandler, &scenario(), &personality(), &env)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_template_variable() {
        let strategy =
            DelegatedStrategy::new(Arc::new(Canned("{}"))).with_template(PromptTemplate::new("{nope}"));
        let err = strategy
            .evaluate(
                &ChatMessageHandler,
                &scenario(),
                &personality(),
                &EvaluationEnvironment::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }
}
