//! Handler registry and routing.
//!
//! The dispatcher is an ordinary value: build one per run (or per test) and
//! pass it where it is needed. Routing is by the scenario's content type.

use std::collections::HashMap;
use std::sync::Arc;

use super::handlers::{
    ChatMessageHandler, EmailHandler, GenericHandler, NewsArticleHandler, SocialPostHandler,
    ThreadHandler,
};
use super::{EvaluationEnvironment, EvaluationHandler, EvaluationResult};
use crate::content::ScenarioType;
use crate::error::{HarnessError, Result};
use crate::persona::ReferencePersonality;
use crate::scenario::Scenario;
use crate::strategy::EvaluationStrategy;

/// Maps content types to handlers and runs them through a strategy.
#[derive(Debug, Clone)]
pub struct EvaluationDispatcher {
    handlers: HashMap<ScenarioType, Arc<dyn EvaluationHandler>>,
    strategy: Arc<dyn EvaluationStrategy>,
}

impl EvaluationDispatcher {
    /// Empty registry using `strategy`.
    pub fn new(strategy: Arc<dyn EvaluationStrategy>) -> Self {
        Self {
            handlers: HashMap::new(),
            strategy,
        }
    }

    /// Registry with one handler for every content variant.
    pub fn with_default_handlers(strategy: Arc<dyn EvaluationStrategy>) -> Self {
        let mut dispatcher = Self::new(strategy);
        dispatcher.register(ThreadHandler);
        dispatcher.register(ChatMessageHandler);
        dispatcher.register(EmailHandler);
        dispatcher.register(SocialPostHandler);
        dispatcher.register(NewsArticleHandler);
        dispatcher.register(GenericHandler);
        dispatcher
    }

    /// Register a handler under its supported type, returning the one it
    /// replaced.
    pub fn register<H>(&mut self, handler: H) -> Option<Arc<dyn EvaluationHandler>>
    where
        H: EvaluationHandler + 'static,
    {
        let ty = handler.supported_type();
        log::debug!("Registering evaluation handler for {}", ty);
        self.handlers.insert(ty, Arc::new(handler))
    }

    pub fn handler(&self, ty: ScenarioType) -> Option<&dyn EvaluationHandler> {
        self.handlers.get(&ty).map(|h| h.as_ref())
    }

    /// Registered content types in declaration order.
    pub fn supported_types(&self) -> Vec<ScenarioType> {
        ScenarioType::ALL
            .into_iter()
            .filter(|ty| self.handlers.contains_key(ty))
            .collect()
    }

    pub fn strategy(&self) -> &Arc<dyn EvaluationStrategy> {
        &self.strategy
    }

    /// Evaluate `scenario` for `personality`.
    ///
    /// Fails with `NoHandler` when the scenario's content type has no
    /// registered handler. The returned result always satisfies the
    /// confidence and state invariants.
    pub async fn dispatch(
        &self,
        scenario: &Scenario,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult> {
        let ty = scenario.scenario_type();
        let handler = self
            .handlers
            .get(&ty)
            .ok_or(HarnessError::NoHandler(ty))?;

        log::debug!(
            "Dispatching '{}' ({}) for {} via {} strategy",
            scenario.name,
            ty,
            personality.name,
            self.strategy.name()
        );

        let result = self
            .strategy
            .evaluate(handler.as_ref(), scenario, personality, env)
            .await?;
        Ok(result.normalized())
    }
}

// ============================================================================
// Tests
// ============================================================================
