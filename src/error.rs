//! Harness errors.

use thiserror::Error;

use crate::content::ScenarioType;
use crate::llms::CompletionError;

/// Errors raised while loading fixtures, composing personalities, or
/// evaluating scenarios.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The requested base personality is not loaded.
    #[error("Personality not found: {0}")]
    PersonalityNotFound(String),

    /// The requested extension is not registered for this personality.
    #[error("Extension '{extension}' not found for personality '{personality}'")]
    ExtensionNotFound {
        personality: String,
        extension: String,
    },

    /// Unknown content/scenario type tag.
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    /// Dispatch to a content type with no registered handler.
    #[error("No evaluation handler registered for content type: {0}")]
    NoHandler(ScenarioType),

    /// A handler was given content of the wrong variant.
    #[error("Content mismatch: expected {expected}, got {actual}")]
    ContentMismatch {
        expected: ScenarioType,
        actual: ScenarioType,
    },

    /// The delegated evaluation call failed or returned unusable text.
    #[error("Evaluation unavailable: {0}")]
    EvaluationUnavailable(String),

    /// The run was cancelled while this case was in flight.
    #[error("Evaluation cancelled")]
    Cancelled,

    /// A fixture file or directory could not be loaded.
    #[error("Fixture error at {path}: {message}")]
    Fixture { path: String, message: String },

    /// A memory fact is missing a required field.
    #[error("Invalid memory fact: {0}")]
    InvalidMemoryFact(String),

    /// Invalid harness configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HarnessError {
    pub(crate) fn fixture(path: impl AsRef<std::path::Path>, message: impl ToString) -> Self {
        Self::Fixture {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    /// True for unknown personalities and extensions.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PersonalityNotFound(_) | Self::ExtensionNotFound { .. }
        )
    }

    /// True for errors that abort only the test case that raised them.
    pub fn is_case_local(&self) -> bool {
        matches!(
            self,
            Self::PersonalityNotFound(_)
                | Self::ExtensionNotFound { .. }
                | Self::NoHandler(_)
                | Self::ContentMismatch { .. }
                | Self::EvaluationUnavailable(_)
                | Self::Cancelled
        )
    }
}

impl From<CompletionError> for HarnessError {
    fn from(err: CompletionError) -> Self {
        Self::EvaluationUnavailable(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HarnessError>;

// ============================================================================
// Tests
// ============================================================================
