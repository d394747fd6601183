//! Personality records: bases, extensions, and the materialized reference
//! personality a test case evaluates against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{HarnessError, Result};

// ============================================================================
// Profile
// ============================================================================

/// Demographic and stylistic profile.
///
/// When used as an extension override only non-empty/non-zero fields take
/// effect; see [`PersonalityProfile::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub core_traits: Vec<String>,
    #[serde(default)]
    pub communication_style: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub background: String,
}

impl PersonalityProfile {
    /// Layer `overrides` on top of `self`.
    ///
    /// Scalars are last-writer-wins when the override is non-empty; lists
    /// are appended with no deduplication.
    pub fn merge(&mut self, overrides: &PersonalityProfile) {
        if overrides.age > 0 {
            self.age = overrides.age;
        }
        overwrite_if_set(&mut self.occupation, &overrides.occupation);
        overwrite_if_set(&mut self.communication_style, &overrides.communication_style);
        overwrite_if_set(&mut self.location, &overrides.location);
        overwrite_if_set(&mut self.background, &overrides.background);
        self.interests.extend(overrides.interests.iter().cloned());
        self.core_traits.extend(overrides.core_traits.iter().cloned());
    }
}

fn overwrite_if_set(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

// ============================================================================
// Facts, conversations, plans
// ============================================================================

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 3;
pub const DEFAULT_IMPORTANCE: u8 = 2;
pub const DEFAULT_SENSITIVITY: &str = "low";
pub const FACT_SOURCE: &str = "personality_test";

/// Memory fact categories.
pub mod category {
    pub const PREFERENCE: &str = "preference";
    pub const GOAL_PLAN: &str = "goal_plan";
    pub const SKILL_EXPERTISE: &str = "skill_expertise";
    pub const RELATIONSHIP: &str = "relationship";
    pub const VALUE_BELIEF: &str = "value_belief";
    pub const HABIT_ROUTINE: &str = "habit_routine";
    pub const EXPERIENCE_EVENT: &str = "experience_event";
}

fn default_importance() -> u8 {
    DEFAULT_IMPORTANCE
}

/// Map a raw importance onto 1..=3. Zero means unset.
pub fn normalize_importance(raw: f64) -> u8 {
    if raw == 0.0 || raw.is_nan() {
        return DEFAULT_IMPORTANCE;
    }
    raw.round()
        .clamp(f64::from(MIN_IMPORTANCE), f64::from(MAX_IMPORTANCE)) as u8
}

fn deserialize_importance<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(DEFAULT_IMPORTANCE);
    };
    let importance = normalize_importance(raw);
    if f64::from(importance) != raw && raw != 0.0 {
        log::warn!("Memory fact importance {} clamped to {}", raw, importance);
    }
    Ok(importance)
}

/// A remembered fact about the personality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFact {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub attribute: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Free-text form of the fact; older fixtures only carry this.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// 1-3, 3 being most important.
    #[serde(
        default = "default_importance",
        deserialize_with = "deserialize_importance"
    )]
    pub importance: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_context: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sensitivity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Default for MemoryFact {
    fn default() -> Self {
        Self {
            id: String::new(),
            category: String::new(),
            subject: String::new(),
            attribute: String::new(),
            value: String::new(),
            content: String::new(),
            importance: DEFAULT_IMPORTANCE,
            tags: Vec::new(),
            temporal_context: None,
            sensitivity: String::new(),
            created_at: None,
            metadata: Map::new(),
        }
    }
}

impl MemoryFact {
    /// One-line rendering used in prompts.
    pub fn summary(&self) -> String {
        if !self.content.is_empty() {
            return self.content.clone();
        }
        [self.subject.as_str(), self.attribute.as_str(), self.value.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check that category, subject, attribute and value are all set.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("category", &self.category),
            ("subject", &self.subject),
            ("attribute", &self.attribute),
            ("value", &self.value),
        ];
        match required.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((field, _)) => Err(HarnessError::InvalidMemoryFact(format!(
                "{} is required",
                field
            ))),
            None => Ok(()),
        }
    }
}

/// Builds one validated [`MemoryFact`].
///
/// `build` fills in the defaults: content `"<subject> - <value>"`,
/// sensitivity `low`, importance 2.
#[derive(Debug, Clone)]
pub struct MemoryFactBuilder {
    fact: MemoryFact,
}

impl Default for MemoryFactBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFactBuilder {
    pub fn new() -> Self {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::from(FACT_SOURCE));
        Self {
            fact: MemoryFact {
                created_at: Some(Utc::now()),
                metadata,
                ..Default::default()
            },
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.fact.category = category.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.fact.subject = subject.into();
        self
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.fact.attribute = attribute.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.fact.value = value.into();
        self
    }

    pub fn temporal_context(mut self, context: impl Into<String>) -> Self {
        self.fact.temporal_context = Some(context.into());
        self
    }

    pub fn sensitivity(mut self, sensitivity: impl Into<String>) -> Self {
        self.fact.sensitivity = sensitivity.into();
        self
    }

    /// Clamped to 1..=3.
    pub fn importance(mut self, importance: u8) -> Self {
        self.fact.importance = importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.fact.content = content.into();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.fact.tags.extend(tags);
        self
    }

    pub fn build(mut self) -> Result<MemoryFact> {
        self.fact.validate()?;
        if self.fact.content.is_empty() {
            self.fact.content = format!("{} - {}", self.fact.subject, self.fact.value);
        }
        if self.fact.sensitivity.is_empty() {
            self.fact.sensitivity = DEFAULT_SENSITIVITY.to_string();
        }
        Ok(self.fact)
    }
}

/// Collects the memory facts of one personality, one category helper per
/// kind of fact. Facts that fail validation are logged and dropped.
#[derive(Debug, Clone)]
pub struct PersonalityMemoryBuilder {
    personality: String,
    facts: Vec<MemoryFact>,
}

impl PersonalityMemoryBuilder {
    const SUBJECT: &'static str = "user";

    pub fn new(personality: impl Into<String>) -> Self {
        Self {
            personality: personality.into(),
            facts: Vec::new(),
        }
    }

    fn user_fact(category: &str, attribute: &str, value: &str, importance: u8) -> MemoryFactBuilder {
        MemoryFactBuilder::new()
            .category(category)
            .subject(Self::SUBJECT)
            .attribute(attribute)
            .value(value)
            .importance(importance)
    }

    fn push(mut self, builder: MemoryFactBuilder) -> Self {
        match builder.build() {
            Ok(fact) => self.facts.push(fact),
            Err(e) => log::warn!("Dropping memory fact for {}: {}", self.personality, e),
        }
        self
    }

    pub fn preference(self, attribute: &str, value: &str, importance: u8) -> Self {
        self.push(Self::user_fact(category::PREFERENCE, attribute, value, importance))
    }

    pub fn goal(self, attribute: &str, value: &str, timeline: &str, importance: u8) -> Self {
        self.push(
            Self::user_fact(category::GOAL_PLAN, attribute, value, importance)
                .temporal_context(timeline),
        )
    }

    pub fn skill(self, attribute: &str, value: &str, importance: u8) -> Self {
        self.push(Self::user_fact(category::SKILL_EXPERTISE, attribute, value, importance))
    }

    pub fn relationship(
        self,
        attribute: &str,
        value: &str,
        sensitivity: &str,
        importance: u8,
    ) -> Self {
        self.push(
            Self::user_fact(category::RELATIONSHIP, attribute, value, importance)
                .sensitivity(sensitivity),
        )
    }

    pub fn belief(self, attribute: &str, value: &str, importance: u8) -> Self {
        self.push(Self::user_fact(category::VALUE_BELIEF, attribute, value, importance))
    }

    pub fn habit(self, attribute: &str, value: &str, importance: u8) -> Self {
        self.push(Self::user_fact(category::HABIT_ROUTINE, attribute, value, importance))
    }

    pub fn experience(self, attribute: &str, value: &str, when: &str, importance: u8) -> Self {
        self.push(
            Self::user_fact(category::EXPERIENCE_EVENT, attribute, value, importance)
                .temporal_context(when),
        )
    }

    /// Any fact; `configure` adjusts the builder before validation.
    pub fn custom<F>(
        self,
        category: &str,
        subject: &str,
        attribute: &str,
        value: &str,
        configure: F,
    ) -> Self
    where
        F: FnOnce(MemoryFactBuilder) -> MemoryFactBuilder,
    {
        let builder = MemoryFactBuilder::new()
            .category(category)
            .subject(subject)
            .attribute(attribute)
            .value(value);
        self.push(configure(builder))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn build(self) -> Vec<MemoryFact> {
        self.facts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityPlan {
    /// `short_term`, `long_term`, `project`.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub priority: u8,
    /// `planning`, `active`, `completed`.
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Behaviour an extension is expected to induce, kept for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedBehavior {
    #[serde(default)]
    pub scenario_type: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected: Map<String, Value>,
    #[serde(default)]
    pub confidence: f64,
}

// ============================================================================
// Base, extension, reference
// ============================================================================

/// A canonical, extension-free personality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasePersonality {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile: PersonalityProfile,
    #[serde(default)]
    pub memory_facts: Vec<MemoryFact>,
    #[serde(default)]
    pub conversations: Vec<ConversationDocument>,
    #[serde(default)]
    pub plans: Vec<PersonalityPlan>,
}

impl BasePersonality {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A named delta layered onto a base personality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityExtension {
    pub test_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_facts: Vec<MemoryFact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_plans: Vec<PersonalityPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_overrides: Option<PersonalityProfile>,
    #[serde(default)]
    pub expected_behaviors: Vec<ExpectedBehavior>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PersonalityExtension {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A base personality with extensions applied. Rebuilt per test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencePersonality {
    /// `base_ext1_ext2...`
    pub name: String,
    pub description: String,
    pub profile: PersonalityProfile,
    pub memory_facts: Vec<MemoryFact>,
    pub conversations: Vec<ConversationDocument>,
    pub plans: Vec<PersonalityPlan>,
    pub expected_behaviors: Vec<ExpectedBehavior>,
    /// Name of the base this was composed from.
    pub base_name: String,
    /// Registry keys of the applied extensions, in application order.
    pub extension_names: Vec<String>,
}

impl ReferencePersonality {
    pub fn has_extensions(&self) -> bool {
        !self.extension_names.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
