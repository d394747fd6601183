//! Harness configuration.
//!
//! Precedence: CLI flags > environment > YAML file > defaults.
//!
//! ```yaml
//! data_dir: testdata
//! output: personality_test_report.json
//! mode: delegated
//! concurrency: 4
//! case_timeout_secs: 30
//! completion:
//!   model: gpt-4o-mini
//!   base_url: https://api.openai.com/v1
//!   temperature: 0.1
//!   timeout_secs: 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::llms::providers::openai::DEFAULT_BASE_URL;
use crate::strategy::{EvaluationMode, ExtensionBonusTable};

pub const ENV_API_KEY: &str = "COMPLETIONS_API_KEY";
pub const ENV_API_URL: &str = "COMPLETIONS_API_URL";
pub const ENV_MODE: &str = "PERSONALITY_TEST_MODE";

fn default_data_dir() -> PathBuf {
    PathBuf::from("testdata")
}

fn default_output() -> PathBuf {
    PathBuf::from("personality_test_report.json")
}

fn default_concurrency() -> usize {
    1
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_timeout_secs() -> u64 {
    60
}

/// Settings for the delegated completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Usually supplied through `COMPLETIONS_API_KEY` rather than the file.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub mode: EvaluationMode,
    /// Maximum in-flight cases; 1 runs sequentially.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub case_timeout_secs: Option<u64>,
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Replaces the built-in extension bonus table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<ExtensionBonusTable>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output: default_output(),
            mode: EvaluationMode::default(),
            concurrency: default_concurrency(),
            case_timeout_secs: None,
            completion: CompletionConfig::default(),
            bonus: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml =
            std::fs::read_to_string(path).map_err(|e| HarnessError::fixture(path, e))?;
        let config = Self::from_yaml(&yaml)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.completion.api_key = Some(key);
        }
        if let Some(url) = get(ENV_API_URL) {
            self.completion.base_url = url;
        }
        if let Some(mode) = get(ENV_MODE) {
            self.mode = mode.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(HarnessError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.mode == EvaluationMode::Delegated && self.completion.api_key.is_none() {
            return Err(HarnessError::Config(format!(
                "delegated mode requires an API key (set {})",
                ENV_API_KEY
            )));
        }
        Ok(())
    }

    pub fn case_timeout(&self) -> Option<Duration> {
        self.case_timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("testdata"));
        assert_eq!(config.mode, EvaluationMode::Mock);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.completion.timeout_secs, 60);
        assert!(config.case_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = HarnessConfig::from_yaml(
            "mode: delegated\nconcurrency: 4\ncase_timeout_secs: 30\ncompletion:\n  model: local\n",
        )
        .unwrap();
        assert_eq!(config.mode, EvaluationMode::Delegated);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.case_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.completion.model, "local");
        assert_eq!(config.completion.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.output, PathBuf::from("personality_test_report.json"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_KEY, "sk-test"),
            (ENV_API_URL, "http://localhost:8080/v1"),
            (ENV_MODE, "delegated"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.completion.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.completion.base_url, "http://localhost:8080/v1");
        assert_eq!(config.mode, EvaluationMode::Delegated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_env_mode() {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_env_from(|k| (k == ENV_MODE).then(|| "llm".to_string()))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = HarnessConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.concurrency = 2;
        config.mode = EvaluationMode::Delegated;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(ENV_API_KEY));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.yaml");
        std::fs::write(&path, "data_dir: fixtures\n").unwrap();
        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("fixtures"));

        assert!(HarnessConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
