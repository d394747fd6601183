//! Keyword heuristics shared by every handler.
//!
//! A personality is classified into an [`Archetype`]; each archetype carries
//! a static [`InterestProfile`] (keyword tables, domain overrides, and the
//! confidences each rule produces). [`run_cascade`] applies the ordered rule
//! cascade, stopping at the first rule that fires:
//!
//! 1. negative/spam keyword present -> reject
//! 2. two or more interest matches -> accept
//! 3. exactly one interest match -> accept
//! 4. `context.domain` override
//! 5. long enough -> accept, otherwise reject as low-signal
//!
//! Keyword matching is case-folded substring containment, so short keywords
//! such as `ai` also hit inside longer words.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::EvaluationResult;
use crate::persona::ReferencePersonality;

// ============================================================================
// Archetype
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Technology,
    Creative,
    General,
}

const TECHNOLOGY_MARKERS: &[&str] = &["tech", "entrepreneur", "founder", "engineer", "developer"];
const CREATIVE_MARKERS: &[&str] = &["creative", "artist", "designer", "illustrator"];

impl Archetype {
    /// Classify by base name first, then by occupation.
    pub fn classify(personality: &ReferencePersonality) -> Self {
        let base = if personality.base_name.is_empty() {
            &personality.name
        } else {
            &personality.base_name
        };
        Self::from_markers(&base.to_lowercase())
            .or_else(|| Self::from_markers(&personality.profile.occupation.to_lowercase()))
            .unwrap_or(Archetype::General)
    }

    fn from_markers(text: &str) -> Option<Self> {
        if TECHNOLOGY_MARKERS.iter().any(|m| text.contains(m)) {
            Some(Archetype::Technology)
        } else if CREATIVE_MARKERS.iter().any(|m| text.contains(m)) {
            Some(Archetype::Creative)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Technology => "technology",
            Archetype::Creative => "creative",
            Archetype::General => "general",
        }
    }

    pub fn profile(&self) -> &'static InterestProfile {
        match self {
            Archetype::Technology => &TECHNOLOGY,
            Archetype::Creative => &CREATIVE,
            Archetype::General => &GENERAL,
        }
    }
}

// ============================================================================
// Interest profiles
// ============================================================================

/// Fixed decision for a `context.domain` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainRule {
    pub domain: &'static str,
    pub should_show: bool,
    pub confidence: f64,
}

/// A platform that counts as an interest match for an archetype.
#[derive(Debug, Clone, Copy)]
pub struct PlatformAffinity {
    pub platform: &'static str,
    pub requires_images: bool,
    /// When non-empty, at least one must appear in the text.
    pub any_keywords: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct InterestProfile {
    pub archetype: Archetype,
    pub interest_keywords: &'static [&'static str],
    pub negative_keywords: &'static [&'static str],
    pub domain_rules: &'static [DomainRule],
    pub platform_affinities: &'static [PlatformAffinity],
    pub reject_confidence: f64,
    pub strong_confidence: f64,
    pub single_match_confidence: f64,
    pub substantial_confidence: f64,
    pub short_confidence: f64,
    /// Word count a text must exceed to count as substantial.
    pub min_words: usize,
}

static TECHNOLOGY: InterestProfile = InterestProfile {
    archetype: Archetype::Technology,
    interest_keywords: &[
        "ai",
        "startup",
        "funding",
        "technology",
        "innovation",
        "venture",
        "series",
        "investment",
        "automation",
        "machine learning",
        "artificial intelligence",
    ],
    negative_keywords: &["scandal", "drama", "reality tv"],
    domain_rules: &[
        DomainRule { domain: "artificial_intelligence", should_show: true, confidence: 0.9 },
        DomainRule { domain: "venture_capital", should_show: true, confidence: 0.9 },
        DomainRule { domain: "technical_education", should_show: true, confidence: 0.9 },
        DomainRule { domain: "entertainment_gossip", should_show: false, confidence: 0.9 },
    ],
    platform_affinities: &[
        PlatformAffinity { platform: "linkedin", requires_images: false, any_keywords: &[] },
        PlatformAffinity {
            platform: "twitter",
            requires_images: false,
            any_keywords: &["ai", "tech", "startup", "innovation"],
        },
    ],
    reject_confidence: 0.9,
    strong_confidence: 0.95,
    single_match_confidence: 0.8,
    substantial_confidence: 0.6,
    short_confidence: 0.7,
    min_words: 10,
};

static CREATIVE: InterestProfile = InterestProfile {
    archetype: Archetype::Creative,
    interest_keywords: &[
        "art",
        "creative",
        "design",
        "visual",
        "artistic",
        "painting",
        "illustration",
        "digital art",
        "procreate",
        "adobe",
        "photoshop",
        "creativity",
        "aesthetic",
    ],
    negative_keywords: &["celebrity", "gossip", "scandal", "drama"],
    domain_rules: &[
        DomainRule { domain: "creative_tools", should_show: true, confidence: 0.9 },
        DomainRule { domain: "artificial_intelligence", should_show: true, confidence: 0.65 },
        DomainRule { domain: "entertainment_gossip", should_show: false, confidence: 0.8 },
        DomainRule { domain: "venture_capital", should_show: false, confidence: 0.7 },
    ],
    platform_affinities: &[PlatformAffinity {
        platform: "instagram",
        requires_images: true,
        any_keywords: &[],
    }],
    reject_confidence: 0.9,
    strong_confidence: 0.95,
    single_match_confidence: 0.85,
    substantial_confidence: 0.5,
    short_confidence: 0.6,
    min_words: 10,
};

static GENERAL: InterestProfile = InterestProfile {
    archetype: Archetype::General,
    interest_keywords: &[
        "analysis",
        "research",
        "study",
        "insight",
        "comprehensive",
        "detailed",
    ],
    negative_keywords: &["click here", "limited time", "act now", "free money", "guaranteed"],
    domain_rules: &[DomainRule {
        domain: "entertainment_gossip",
        should_show: false,
        confidence: 0.9,
    }],
    platform_affinities: &[],
    reject_confidence: 0.95,
    strong_confidence: 0.95,
    single_match_confidence: 0.8,
    substantial_confidence: 0.6,
    short_confidence: 0.9,
    min_words: 10,
};

impl InterestProfile {
    pub fn for_personality(personality: &ReferencePersonality) -> &'static InterestProfile {
        Archetype::classify(personality).profile()
    }

    pub fn domain_rule(&self, domain: &str) -> Option<&DomainRule> {
        self.domain_rules.iter().find(|r| r.domain == domain)
    }

    /// First negative keyword found in `text`.
    pub fn negative_hit(&self, text: &str) -> Option<&'static str> {
        self.negative_keywords
            .iter()
            .copied()
            .find(|kw| text.contains(kw))
    }

    /// Archetype keywords plus the personality's own interests that appear
    /// in `text`, each counted once.
    pub fn interest_matches(&self, text: &str, personality: &ReferencePersonality) -> Vec<String> {
        let mut matched: Vec<String> = Vec::new();
        let own = personality
            .profile
            .interests
            .iter()
            .map(|i| i.trim().to_lowercase());
        let candidates = self
            .interest_keywords
            .iter()
            .map(|k| k.to_string())
            .chain(own);
        for keyword in candidates {
            if !keyword.is_empty() && text.contains(&keyword) && !matched.contains(&keyword) {
                matched.push(keyword);
            }
        }
        matched
    }

    /// Whether posting on `platform` counts as an interest match.
    pub fn platform_affinity(&self, platform: &str, has_images: bool, text: &str) -> bool {
        let platform = platform.to_lowercase();
        self.platform_affinities.iter().any(|a| {
            a.platform == platform
                && (!a.requires_images || has_images)
                && (a.any_keywords.is_empty() || a.any_keywords.iter().any(|k| text.contains(k)))
        })
    }
}

// ============================================================================
// Cascade
// ============================================================================

/// Which cascade rule produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeRule {
    PriorityOverride,
    HardReject,
    StrongInterest,
    SingleInterest,
    DomainOverride,
    Substantial,
    TooShort,
}

impl CascadeRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeRule::PriorityOverride => "priority_override",
            CascadeRule::HardReject => "hard_reject",
            CascadeRule::StrongInterest => "strong_interest",
            CascadeRule::SingleInterest => "single_interest",
            CascadeRule::DomainOverride => "domain_override",
            CascadeRule::Substantial => "substantial",
            CascadeRule::TooShort => "too_short",
        }
    }
}

/// Inputs to the cascade, already case-folded.
#[derive(Debug, Clone)]
pub struct Signals<'a> {
    pub text: &'a str,
    pub domain: Option<&'a str>,
    /// Matches contributed by the variant itself (e.g. platform affinity).
    pub extra_matches: Vec<String>,
}

impl<'a> Signals<'a> {
    pub fn new(text: &'a str, domain: Option<&'a str>) -> Self {
        Self {
            text,
            domain,
            extra_matches: Vec::new(),
        }
    }

    pub fn with_extra_match(mut self, label: impl Into<String>) -> Self {
        self.extra_matches.push(label.into());
        self
    }
}

/// Run the rule cascade. The result carries `rule`, `archetype` and
/// `matched_keywords` metadata.
pub fn run_cascade(
    profile: &InterestProfile,
    personality: &ReferencePersonality,
    signals: &Signals<'_>,
) -> EvaluationResult {
    let name = &personality.name;
    let mut matched = profile.interest_matches(signals.text, personality);
    matched.extend(signals.extra_matches.iter().cloned());

    let (rule, result) = if let Some(negative) = profile.negative_hit(signals.text) {
        (
            CascadeRule::HardReject,
            EvaluationResult::reject(
                profile.reject_confidence,
                format!("Contains '{}', which {} avoids", negative, name),
            ),
        )
    } else if matched.len() >= 2 {
        (
            CascadeRule::StrongInterest,
            EvaluationResult::accept(
                profile.strong_confidence,
                format!(
                    "High relevance for {}: {} interest matches ({})",
                    name,
                    matched.len(),
                    matched.join(", ")
                ),
            ),
        )
    } else if matched.len() == 1 {
        (
            CascadeRule::SingleInterest,
            EvaluationResult::accept(
                profile.single_match_confidence,
                format!("Relevant to {}'s interest in {}", name, matched[0]),
            ),
        )
    } else if let Some(rule) = signals.domain.and_then(|d| profile.domain_rule(d)) {
        let verdict = if rule.should_show { "relevant" } else { "not relevant" };
        (
            CascadeRule::DomainOverride,
            EvaluationResult::new(
                rule.should_show,
                rule.confidence,
                format!("{} content is {} for {}", rule.domain, verdict, name),
            ),
        )
    } else if signals.text.split_whitespace().count() > profile.min_words {
        (
            CascadeRule::Substantial,
            EvaluationResult::accept(
                profile.substantial_confidence,
                format!("Substantial content with moderate relevance for {}", name),
            ),
        )
    } else {
        (
            CascadeRule::TooShort,
            EvaluationResult::reject(
                profile.short_confidence,
                format!("Content too short or low-signal for {}", name),
            ),
        )
    };

    log::debug!(
        "Cascade for {}: rule={} show={} confidence={:.2}",
        name,
        rule.as_str(),
        result.should_show,
        result.confidence
    );

    result
        .with_metadata("rule", rule.as_str())
        .with_metadata("archetype", profile.archetype.as_str())
        .with_metadata("matched_keywords", json!(matched))
}

// ============================================================================
// Tests
// ============================================================================
