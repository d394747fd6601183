//! Evaluation strategies: how a handler's verdict becomes the final result.
//!
//! - [`MockStrategy`] runs the handler's heuristics and adds the extension
//!   bonus. Deterministic, no I/O.
//! - [`DelegatedStrategy`] asks an external completion provider and parses
//!   its reply.
//!
//! The dispatcher only sees the [`EvaluationStrategy`] trait, so tests can
//! swap in fakes.

pub mod bonus;
pub mod delegated;
pub mod mock;
pub mod prompt;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::evaluation::{EvaluationEnvironment, EvaluationHandler, EvaluationResult};
use crate::llms::OpenAICompatibleCompletion;
use crate::persona::ReferencePersonality;
use crate::scenario::Scenario;

pub use bonus::{ExtensionBonusTable, KeywordCondition};
pub use delegated::{parse_evaluation_reply, DelegatedStrategy};
pub use mock::MockStrategy;
pub use prompt::PromptTemplate;

#[async_trait]
pub trait EvaluationStrategy: Send + Sync + fmt::Debug {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Produce a result for `scenario` as seen by `personality`. `handler`
    /// is the one registered for the scenario's content type.
    async fn evaluate(
        &self,
        handler: &dyn EvaluationHandler,
        scenario: &Scenario,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult>;
}

/// Which strategy a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    #[default]
    Mock,
    Delegated,
}

impl EvaluationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationMode::Mock => "mock",
            EvaluationMode::Delegated => "delegated",
        }
    }
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(EvaluationMode::Mock),
            "delegated" => Ok(EvaluationMode::Delegated),
            other => Err(HarnessError::Config(format!(
                "unknown evaluation mode '{}' (expected mock or delegated)",
                other
            ))),
        }
    }
}

/// Build the strategy selected by `config`.
pub fn from_config(config: &HarnessConfig) -> Result<Arc<dyn EvaluationStrategy>> {
    match config.mode {
        EvaluationMode::Mock => {
            let table = config.bonus.clone().unwrap_or_default();
            Ok(Arc::new(MockStrategy::new(table)))
        }
        EvaluationMode::Delegated => {
            let provider = OpenAICompatibleCompletion::from_config(&config.completion)?;
            log::info!(
                "Delegated evaluation via {} ({})",
                config.completion.base_url,
                config.completion.model
            );
            Ok(Arc::new(DelegatedStrategy::new(Arc::new(provider))))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
