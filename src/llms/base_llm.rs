//! Completion provider trait.
//!
//! A provider takes one prompt and returns one free-text reply. Everything
//! about turning that reply into an evaluation lives in the delegated
//! strategy, so providers stay transport-only.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Transport-level failures of a completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; `body` is truncated.
    #[error("Completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("No API key configured for completion provider")]
    MissingApiKey,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single chat message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionProvider trait
// ---------------------------------------------------------------------------

/// One prompt in, one reply out.
///
/// Implementations must not retry; the caller decides what a failure means.
#[async_trait]
pub trait CompletionProvider: Send + Sync + fmt::Debug {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Provider name, for logging.
    fn provider(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Echo;

    #[async_trait]
    impl CompletionProvider for Echo {
        fn model(&self) -> &str {
            "echo-1"
        }

        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn test_provider_defaults() {
        let p: Box<dyn CompletionProvider> = Box::new(Echo);
        assert_eq!(p.provider(), "openai");
        assert_eq!(p.complete("hi").await.unwrap(), "hi");
    }

    #[test]
    fn test_chat_message_user() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_error_display() {
        let err = CompletionError::Status {
            status: 401,
            body: "bad key".into(),
        };
        assert_eq!(err.to_string(), "Completion API returned 401: bad key");
        assert!(CompletionError::MissingApiKey.to_string().contains("API key"));
    }
}
