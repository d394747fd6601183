//! Evaluation: decide whether a personality wants to see a piece of content.
//!
//! Provides:
//! - [`EvaluationResult`] and the [`VisibilityState`] it implies
//! - [`EvaluationEnvironment`], the per-case context handed to every handler
//! - The [`EvaluationHandler`] trait, one implementation per content variant
//! - [`EvaluationDispatcher`], an explicitly constructed handler registry

pub mod dispatcher;
pub mod handlers;
pub mod heuristics;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cancellation::CancellationToken;
use crate::content::{Content, ScenarioType};
use crate::error::Result;
use crate::persona::ReferencePersonality;

pub use dispatcher::EvaluationDispatcher;
pub use handlers::{
    ChatMessageHandler, EmailHandler, GenericHandler, NewsArticleHandler, SocialPostHandler,
    ThreadHandler,
};
pub use heuristics::{Archetype, CascadeRule, InterestProfile};

// ---------------------------------------------------------------------------
// Visibility state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    Visible,
    Hidden,
}

impl VisibilityState {
    pub fn from_should_show(should_show: bool) -> Self {
        if should_show {
            Self::Visible
        } else {
            Self::Hidden
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

impl fmt::Display for VisibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "visible" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            other => Err(format!("unknown visibility state '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation result
// ---------------------------------------------------------------------------

/// Outcome of evaluating one scenario for one personality.
///
/// Constructed through [`EvaluationResult::new`], which keeps `confidence`
/// in `[0, 1]` and `new_state` visible iff `should_show`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub should_show: bool,
    pub confidence: f64,
    pub reason: String,
    pub new_state: VisibilityState,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl EvaluationResult {
    pub fn new(should_show: bool, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            should_show,
            confidence: clamp_confidence(confidence),
            reason: reason.into(),
            new_state: VisibilityState::from_should_show(should_show),
            metadata: Map::new(),
        }
    }

    pub fn accept(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(true, confidence, reason)
    }

    pub fn reject(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(false, confidence, reason)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    /// Re-establish the invariants after a field was set directly.
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        self.new_state = VisibilityState::from_should_show(self.should_show);
        self
    }
}

/// Clamp into `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Per-case inputs beyond content and personality.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEnvironment {
    /// The scenario's free-form context map (`domain`, ...).
    pub context: Map<String, Value>,
    pub cancel: CancellationToken,
    /// Upper bound on a single delegated evaluation.
    pub deadline: Option<Duration>,
}

impl EvaluationEnvironment {
    pub fn new(context: Map<String, Value>, cancel: CancellationToken) -> Self {
        Self {
            context,
            cancel,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// `context.domain`, when present and a string.
    pub fn domain(&self) -> Option<&str> {
        self.context.get("domain").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Content-type-specific heuristic evaluation.
///
/// Implementations are pure: the same content, personality and environment
/// always yield the same result.
pub trait EvaluationHandler: Send + Sync + fmt::Debug {
    /// The content variant this handler accepts.
    fn supported_type(&self) -> ScenarioType;

    /// Apply the rule cascade.
    ///
    /// Returns `ContentMismatch` if `content` is not of
    /// [`supported_type`](Self::supported_type).
    fn assess(
        &self,
        content: &Content,
        personality: &ReferencePersonality,
        env: &EvaluationEnvironment,
    ) -> Result<EvaluationResult>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_clamps_and_derives_state() {
        let r = EvaluationResult::new(true, 1.4, "x");
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.new_state, VisibilityState::Visible);

        let r = EvaluationResult::reject(-0.2, "y");
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.new_state, VisibilityState::Hidden);
    }

    #[test]
    fn test_normalized_repairs_state() {
        let mut r = EvaluationResult::accept(0.8, "ok");
        r.should_show = false;
        r.confidence = f64::NAN;
        let r = r.normalized();
        assert_eq!(r.new_state, VisibilityState::Hidden);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn test_visibility_state_parse() {
        assert_eq!(" Visible ".parse::<VisibilityState>().unwrap(), VisibilityState::Visible);
        assert_eq!("hidden".parse::<VisibilityState>().unwrap(), VisibilityState::Hidden);
        assert!("maybe".parse::<VisibilityState>().is_err());
    }

    #[test]
    fn test_visibility_state_serde() {
        let json = serde_json::to_string(&VisibilityState::Hidden).unwrap();
        assert_eq!(json, "\"hidden\"");
    }

    #[test]
    fn test_environment_domain() {
        let mut ctx = Map::new();
        ctx.insert("domain".into(), Value::from("creative_tools"));
        let env = EvaluationEnvironment::new(ctx, CancellationToken::new());
        assert_eq!(env.domain(), Some("creative_tools"));
        assert!(EvaluationEnvironment::default().domain().is_none());
    }
}
