//! Evaluation prompt rendering.
//!
//! Templates use `{variable}` placeholders. Rendering is strict: a
//! placeholder with no input is an error, never a half-filled prompt.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{HarnessError, Result};
use crate::persona::ReferencePersonality;
use crate::scenario::Scenario;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap());

/// Memory facts included in the prompt.
const MAX_PROMPT_FACTS: usize = 10;

pub const DEFAULT_TEMPLATE: &str = r#"You are evaluating whether a person with the following personality profile would want to see a piece of content.

PERSONALITY PROFILE:
Name: {personality_name}
Description: {description}
Age: {age}
Occupation: {occupation}
Interests: {interests}
Core Traits: {core_traits}
Communication Style: {communication_style}
Location: {location}
Background: {background}

KNOWN FACTS:
{memory_facts}

CONTENT TO EVALUATE ({content_type}):
Title: {title}
Summary: {summary}
Full Text: {main_text}
Author: {author}
Keywords: {keywords}
Context: {context}

Respond with a single JSON object in this format:
{
  "should_show": true or false,
  "confidence": 0.0-1.0,
  "reason": "why this person would or would not want to see it",
  "new_state": "visible" or "hidden"
}"#;

/// Replace every `{name}` in `template` from `inputs`.
///
/// Substitution is a single pass, so values containing braces are inserted
/// verbatim.
pub fn interpolate(template: &str, inputs: &HashMap<String, String>) -> Result<String> {
    if let Some(missing) = VARIABLE_PATTERN
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .find(|var| !inputs.contains_key(var))
    {
        return Err(HarnessError::Config(format!(
            "Template variable '{}' not found in prompt inputs",
            missing
        )));
    }

    Ok(VARIABLE_PATTERN
        .replace_all(template, |cap: &Captures<'_>| {
            inputs.get(&cap[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

/// A prompt template plus the inputs it is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of appearance.
    pub fn variables(&self) -> Vec<String> {
        VARIABLE_PATTERN
            .captures_iter(&self.template)
            .map(|cap| cap[1].to_string())
            .collect()
    }

    pub fn render(&self, personality: &ReferencePersonality, scenario: &Scenario) -> Result<String> {
        interpolate(&self.template, &prompt_inputs(personality, scenario))
    }
}

/// Every variable the default template knows about.
pub fn prompt_inputs(personality: &ReferencePersonality, scenario: &Scenario) -> HashMap<String, String> {
    let profile = &personality.profile;
    let content = &scenario.content;

    let facts = personality
        .memory_facts
        .iter()
        .take(MAX_PROMPT_FACTS)
        .map(|f| format!("- {}", f.summary()))
        .collect::<Vec<_>>();
    let memory_facts = if facts.is_empty() {
        "(none)".to_string()
    } else {
        facts.join("\n")
    };

    let age = if profile.age == 0 {
        "unknown".to_string()
    } else {
        profile.age.to_string()
    };

    HashMap::from([
        ("personality_name".to_string(), personality.name.clone()),
        ("description".to_string(), personality.description.clone()),
        ("age".to_string(), age),
        ("occupation".to_string(), profile.occupation.clone()),
        ("interests".to_string(), profile.interests.join(", ")),
        ("core_traits".to_string(), profile.core_traits.join(", ")),
        (
            "communication_style".to_string(),
            profile.communication_style.clone(),
        ),
        ("location".to_string(), profile.location.clone()),
        ("background".to_string(), profile.background.clone()),
        ("memory_facts".to_string(), memory_facts),
        (
            "content_type".to_string(),
            content.content_type().as_str().to_string(),
        ),
        ("title".to_string(), content.display_title()),
        ("summary".to_string(), content.display_summary()),
        ("main_text".to_string(), content.main_text().to_string()),
        (
            "author".to_string(),
            content.author().display_name().to_string(),
        ),
        ("keywords".to_string(), content.keywords().join(", ")),
        (
            "context".to_string(),
            serde_json::to_string(&scenario.context).unwrap_or_default(),
        ),
    ])
}

// ============================================================================
// Tests
// ============================================================================
