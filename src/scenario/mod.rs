//! Scenarios: one piece of content plus the expected outcome for each
//! personality/extension combination.

pub mod builder;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::{Content, ScenarioType};
use crate::error::{HarnessError, Result};
use crate::evaluation::{clamp_confidence, VisibilityState};

pub use builder::{ExpectationBuilder, ScenarioBuilder};

fn default_priority() -> u8 {
    2
}

// ============================================================================
// Expected outcome
// ============================================================================

/// What a personality (optionally with extensions) should make of a scenario.
///
/// `(personality_name, extension_names)` is the logical key. Extension names
/// compare as a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityExpectedOutcome {
    pub personality_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension_names: Vec<String>,
    pub should_show: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reason_keywords: Vec<String>,
    /// Derived from `should_show` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_state: Option<VisibilityState>,
    /// 1-3, 3 being most important.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub rationale: String,
}

impl PersonalityExpectedOutcome {
    pub fn new(personality: impl Into<String>, should_show: bool, confidence: f64) -> Self {
        Self {
            personality_name: personality.into(),
            extension_names: Vec::new(),
            should_show,
            confidence,
            reason_keywords: Vec::new(),
            expected_state: None,
            priority: default_priority(),
            rationale: String::new(),
        }
    }

    pub fn state(&self) -> VisibilityState {
        self.expected_state
            .unwrap_or_else(|| VisibilityState::from_should_show(self.should_show))
    }

    pub fn extension_set(&self) -> BTreeSet<&str> {
        self.extension_names.iter().map(String::as_str).collect()
    }

    /// Extension names in listed order with repeats removed.
    pub fn distinct_extensions(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.extension_names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }

    /// Clamp `confidence` into 0..=1 and `priority` into 1..=3, warning
    /// about any value that had to move.
    pub fn normalized(mut self, scenario: &str) -> Self {
        let confidence = clamp_confidence(self.confidence);
        if confidence != self.confidence {
            log::warn!(
                "Scenario '{}': confidence {} for {} clamped to {}",
                scenario,
                self.confidence,
                self.personality_name,
                confidence
            );
            self.confidence = confidence;
        }
        let priority = self.priority.clamp(1, 3);
        if priority != self.priority {
            log::warn!(
                "Scenario '{}': priority {} for {} clamped to {}",
                scenario,
                self.priority,
                self.personality_name,
                priority
            );
            self.priority = priority;
        }
        self
    }

    fn is_keyed(&self, personality: &str, extensions: &BTreeSet<&str>) -> bool {
        self.personality_name == personality && self.extension_set() == *extensions
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Wire form: the type tag travels next to an undecoded payload.
#[derive(Debug, Clone, Deserialize)]
struct RawScenario {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    scenario_type: String,
    content: Value,
    #[serde(default)]
    context: Map<String, Value>,
    #[serde(default)]
    personality_expectations: Vec<PersonalityExpectedOutcome>,
}

/// Borrowed wire form used for serialization.
#[derive(Serialize)]
struct ScenarioRef<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    scenario_type: &'static str,
    content: &'a Content,
    context: &'a Map<String, Value>,
    personality_expectations: &'a [PersonalityExpectedOutcome],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawScenario")]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub content: Content,
    pub context: Map<String, Value>,
    pub personality_expectations: Vec<PersonalityExpectedOutcome>,
}

impl TryFrom<RawScenario> for Scenario {
    type Error = HarnessError;

    fn try_from(raw: RawScenario) -> Result<Self> {
        let content = Content::from_tagged(&raw.scenario_type, raw.content)?;
        let personality_expectations = raw
            .personality_expectations
            .into_iter()
            .map(|e| e.normalized(&raw.name))
            .collect();
        Ok(Scenario {
            name: raw.name,
            description: raw.description,
            content,
            context: raw.context,
            personality_expectations,
        })
    }
}

impl Serialize for Scenario {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ScenarioRef {
            name: &self.name,
            description: &self.description,
            scenario_type: self.scenario_type().as_str(),
            content: &self.content,
            context: &self.context,
            personality_expectations: &self.personality_expectations,
        }
        .serialize(serializer)
    }
}

impl Scenario {
    /// Decode a scenario, keeping the `UnsupportedType` error intact for
    /// unknown tags rather than folding it into a JSON error.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawScenario = serde_json::from_value(value)?;
        Scenario::try_from(raw)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawScenario = serde_json::from_str(json)?;
        Scenario::try_from(raw)
    }

    pub fn scenario_type(&self) -> ScenarioType {
        self.content.content_type()
    }

    /// `context.domain`, when present and a string.
    pub fn domain(&self) -> Option<&str> {
        self.context.get("domain").and_then(Value::as_str)
    }

    /// Expectation for `personality` with `extensions` applied.
    ///
    /// An exact set match wins. When extensions were requested but none
    /// match exactly, the extension-free record is used. Otherwise `None`,
    /// meaning the combination is not tested.
    pub fn expected_outcome_for<S: AsRef<str>>(
        &self,
        personality: &str,
        extensions: &[S],
    ) -> Option<&PersonalityExpectedOutcome> {
        let requested: BTreeSet<&str> = extensions.iter().map(|s| s.as_ref()).collect();

        if let Some(exact) = self
            .personality_expectations
            .iter()
            .find(|e| e.is_keyed(personality, &requested))
        {
            return Some(exact);
        }

        if requested.is_empty() {
            return None;
        }

        self.personality_expectations
            .iter()
            .find(|e| e.personality_name == personality && e.extension_names.is_empty())
    }

    /// Expectations for `personality` keyed by more than one distinct extension.
    pub fn multi_extension_expectations<'a>(
        &'a self,
        personality: &'a str,
    ) -> impl Iterator<Item = &'a PersonalityExpectedOutcome> + 'a {
        self.personality_expectations
            .iter()
            .filter(move |e| e.personality_name == personality && e.extension_set().len() > 1)
    }

    /// Personality names this scenario has expectations for.
    pub fn personalities(&self) -> BTreeSet<&str> {
        self.personality_expectations
            .iter()
            .map(|e| e.personality_name.as_str())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scenario_json() -> Value {
        json!({
            "name": "ai_funding_news",
            "description": "Series A for an AI startup",
            "type": "news_article",
            "content": {
                "headline": "AI startup raises Series A",
                "body": "The round was led by a top venture firm.",
                "publication": "TechDaily",
                "tags": ["ai", "funding"]
            },
            "context": {"domain": "venture_capital"},
            "personality_expectations": [
                {"personality_name": "tech", "should_show": true, "confidence": 0.9,
                 "expected_state": "visible"},
                {"personality_name": "tech", "extension_names": ["x"], "should_show": true,
                 "confidence": 0.95},
                {"personality_name": "tech", "extension_names": ["b", "a"], "should_show": false,
                 "confidence": 0.6},
                {"personality_name": "creative", "extension_names": ["z"], "should_show": false,
                 "confidence": 0.7}
            ]
        })
    }

    #[test]
    fn test_decode_by_tag() {
        let s = Scenario::from_value(scenario_json()).unwrap();
        assert_eq!(s.scenario_type(), ScenarioType::NewsArticle);
        assert_eq!(s.domain(), Some("venture_capital"));
        assert_eq!(s.content.display_title(), "AI startup raises Series A");
    }

    #[test]
    fn test_out_of_range_expectations_are_clamped() {
        let mut v = scenario_json();
        v["personality_expectations"][0]["confidence"] = json!(1.5);
        v["personality_expectations"][0]["priority"] = json!(7);
        v["personality_expectations"][1]["confidence"] = json!(-0.2);
        v["personality_expectations"][1]["priority"] = json!(0);
        let s = Scenario::from_value(v).unwrap();

        let first = &s.personality_expectations[0];
        assert_eq!(first.confidence, 1.0);
        assert_eq!(first.priority, 3);
        let second = &s.personality_expectations[1];
        assert_eq!(second.confidence, 0.0);
        assert_eq!(second.priority, 1);
        assert_eq!(s.personality_expectations[2].priority, 2);
    }

    #[test]
    fn test_unknown_type_tag() {
        let mut v = scenario_json();
        v["type"] = json!("podcast");
        let err = Scenario::from_value(v).unwrap_err();
        assert!(matches!(err, HarnessError::UnsupportedType(t) if t == "podcast"));
    }

    #[test]
    fn test_serde_round_trip_keeps_tag() {
        let s = Scenario::from_value(scenario_json()).unwrap();
        let encoded = serde_json::to_value(&s).unwrap();
        assert_eq!(encoded["type"], json!("news_article"));
        assert_eq!(encoded["content"]["headline"], json!("AI startup raises Series A"));
        let decoded: Scenario = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn test_lookup_precedence() {
        let s = Scenario::from_value(scenario_json()).unwrap();

        let base = s.expected_outcome_for::<&str>("tech", &[]).unwrap();
        assert!(base.extension_names.is_empty());
        assert_eq!(base.confidence, 0.9);

        let exact = s.expected_outcome_for("tech", &["x"]).unwrap();
        assert_eq!(exact.confidence, 0.95);

        let fallback = s.expected_outcome_for("tech", &["y"]).unwrap();
        assert!(fallback.extension_names.is_empty());
    }

    #[test]
    fn test_lookup_is_order_and_duplicate_insensitive() {
        let s = Scenario::from_value(scenario_json()).unwrap();
        let hit = s.expected_outcome_for("tech", &["a", "b", "a"]).unwrap();
        assert!(!hit.should_show);
        assert_eq!(hit.confidence, 0.6);
    }

    #[test]
    fn test_lookup_without_base_record() {
        let s = Scenario::from_value(scenario_json()).unwrap();
        assert!(s.expected_outcome_for::<&str>("creative", &[]).is_none());
        assert!(s.expected_outcome_for("creative", &["other"]).is_none());
        assert!(s.expected_outcome_for::<&str>("nobody", &[]).is_none());
    }

    #[test]
    fn test_multi_extension_expectations() {
        let s = Scenario::from_value(scenario_json()).unwrap();
        let multi: Vec<_> = s.multi_extension_expectations("tech").collect();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].extension_names, vec!["b", "a"]);
    }

    #[test]
    fn test_expected_state_defaults_from_should_show() {
        let s = Scenario::from_value(scenario_json()).unwrap();
        let hidden = s.expected_outcome_for("tech", &["a", "b"]).unwrap();
        assert_eq!(hidden.state(), VisibilityState::Hidden);
        assert_eq!(hidden.priority, 2);
    }

    #[test]
    fn test_distinct_extensions_keep_order() {
        let mut e = PersonalityExpectedOutcome::new("tech", true, 0.9);
        e.extension_names = vec!["b".into(), "a".into(), "b".into()];
        assert_eq!(e.distinct_extensions(), vec!["b", "a"]);
    }
}
