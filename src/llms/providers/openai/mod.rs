//! OpenAI-compatible chat completions provider.
//!
//! Works against any endpoint that speaks the `/chat/completions` wire
//! format (OpenAI, Azure-style proxies, local gateways). One user message
//! per call, no streaming, no tools, no retries.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::CompletionConfig;
use crate::llms::base_llm::{ChatMessage, CompletionError, CompletionProvider};

/// Characters of an error body kept in [`CompletionError::Status`].
const ERROR_BODY_LIMIT: usize = 500;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client.
///
/// # Example
///
/// ```ignore
/// let provider = OpenAICompatibleCompletion::new("gpt-4o-mini", Some(key))?
///     .with_temperature(0.1);
/// let reply = provider.complete("Say hi").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAICompatibleCompletion {
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f64,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAICompatibleCompletion {
    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Result<Self, CompletionError> {
        let timeout = Duration::from_secs(60);
        Ok(Self {
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            temperature: 0.1,
            timeout,
            client: build_client(timeout)?,
        })
    }

    pub fn from_config(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            timeout,
            client: build_client(timeout)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, CompletionError> {
        self.timeout = timeout;
        self.client = build_client(timeout)?;
        Ok(self)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Request body for a single user prompt.
    pub fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [ChatMessage::user(prompt)],
        })
    }

    /// Extract `choices[0].message.content`.
    pub fn parse_completion_response(response: &Value) -> Result<String, CompletionError> {
        let choice = response
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".into()))?;

        choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CompletionError::MalformedResponse("choice has no text content".into()))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, CompletionError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[async_trait]
impl CompletionProvider for OpenAICompatibleCompletion {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or(CompletionError::MissingApiKey)?;

        log::debug!(
            "Completion request: model={}, prompt_chars={}",
            self.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&self.build_request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| {
            CompletionError::MalformedResponse(format!(
                "{} - body: {}",
                e,
                text.chars().take(ERROR_BODY_LIMIT).collect::<String>()
            ))
        })?;

        Self::parse_completion_response(&json)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let p = OpenAICompatibleCompletion::new("gpt-4o-mini", None)
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(p.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let p = OpenAICompatibleCompletion::new("gpt-4o-mini", None)
            .unwrap()
            .with_temperature(0.3);
        let body = p.build_request_body("Would you read this?");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Would you read this?");
    }

    #[test]
    fn test_parse_completion_response() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"should_show\": true}"}}]
        });
        assert_eq!(
            OpenAICompatibleCompletion::parse_completion_response(&response).unwrap(),
            "{\"should_show\": true}"
        );

        let empty = json!({"choices": []});
        assert!(matches!(
            OpenAICompatibleCompletion::parse_completion_response(&empty),
            Err(CompletionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = CompletionConfig {
            model: "local-model".into(),
            base_url: "http://127.0.0.1:1234/v1".into(),
            api_key: Some("k".into()),
            temperature: 0.0,
            timeout_secs: 5,
        };
        let p = OpenAICompatibleCompletion::from_config(&config).unwrap();
        assert_eq!(p.model(), "local-model");
        assert_eq!(p.endpoint(), "http://127.0.0.1:1234/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let p = OpenAICompatibleCompletion::new("gpt-4o-mini", None).unwrap();
        assert!(matches!(
            p.complete("hi").await,
            Err(CompletionError::MissingApiKey)
        ));
    }
}
