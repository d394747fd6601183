//! Extension bonus applied by the mock strategy.
//!
//! Each active extension with a table entry adds its increment when the
//! entry's keyword condition holds on the scenario text. Synergies reward
//! specific extension pairs on top of that, every extension beyond the
//! first adds a flat amount, and the total is capped below certainty.
//!
//! The table is plain data so it can be overridden from configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::evaluation::EvaluationResult;

fn default_per_additional() -> f64 {
    0.05
}

fn default_ceiling() -> f64 {
    0.98
}

/// Conjunction of keyword groups; each group holds if any of its keywords
/// is a substring of the text. An empty condition always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordCondition {
    pub all_of: Vec<Vec<String>>,
}

impl KeywordCondition {
    pub fn any_of(keywords: &[&str]) -> Self {
        Self::all_of(&[keywords])
    }

    pub fn all_of(groups: &[&[&str]]) -> Self {
        Self {
            all_of: groups
                .iter()
                .map(|g| g.iter().map(|k| k.to_string()).collect())
                .collect(),
        }
    }

    /// `text` must already be case-folded.
    pub fn holds(&self, text: &str) -> bool {
        self.all_of
            .iter()
            .all(|group| group.iter().any(|k| text.contains(k.to_lowercase().as_str())))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionBonus {
    /// Registry key of the extension.
    pub extension: String,
    pub increment: f64,
    #[serde(default)]
    pub when: KeywordCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyBonus {
    /// All of these must be active.
    pub extensions: Vec<String>,
    pub increment: f64,
    #[serde(default)]
    pub when: KeywordCondition,
}

/// Data-driven bonus rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionBonusTable {
    #[serde(default)]
    pub extensions: Vec<ExtensionBonus>,
    #[serde(default)]
    pub synergies: Vec<SynergyBonus>,
    #[serde(default = "default_per_additional")]
    pub per_additional_extension: f64,
    #[serde(default = "default_ceiling")]
    pub ceiling: f64,
}

impl Default for ExtensionBonusTable {
    fn default() -> Self {
        Self {
            extensions: vec![
                ExtensionBonus {
                    extension: "ai_research_focused".into(),
                    increment: 0.1,
                    when: KeywordCondition::any_of(&[
                        "ai",
                        "artificial intelligence",
                        "machine learning",
                        "constitutional ai",
                    ]),
                },
                ExtensionBonus {
                    extension: "startup_ecosystem_focused".into(),
                    increment: 0.1,
                    when: KeywordCondition::any_of(&[
                        "funding",
                        "startup",
                        "series",
                        "investment",
                        "valuation",
                    ]),
                },
                ExtensionBonus {
                    extension: "creative_tools_focused".into(),
                    increment: 0.1,
                    when: KeywordCondition::any_of(&["creative", "design", "art", "tool"]),
                },
                ExtensionBonus {
                    extension: "ai_creative_applications".into(),
                    increment: 0.15,
                    when: KeywordCondition::all_of(&[
                        &["ai", "artificial intelligence"],
                        &["creative", "art", "design"],
                    ]),
                },
            ],
            synergies: vec![SynergyBonus {
                extensions: vec![
                    "ai_research_focused".into(),
                    "startup_ecosystem_focused".into(),
                ],
                increment: 0.2,
                when: KeywordCondition::all_of(&[&["ai"], &["funding", "startup"]]),
            }],
            per_additional_extension: default_per_additional(),
            ceiling: default_ceiling(),
        }
    }
}

/// How a bonus was assembled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonusBreakdown {
    pub matched: Vec<String>,
    pub synergies: Vec<String>,
    pub total: f64,
}

impl ExtensionBonusTable {
    /// Bonus for `extensions` on case-folded `text`, before the ceiling.
    pub fn compute(&self, extensions: &[String], text: &str) -> BonusBreakdown {
        let active: BTreeSet<&str> = extensions.iter().map(String::as_str).collect();
        let mut breakdown = BonusBreakdown::default();
        if active.is_empty() {
            return breakdown;
        }

        for entry in &self.extensions {
            if active.contains(entry.extension.as_str()) && entry.when.holds(text) {
                breakdown.total += entry.increment;
                breakdown.matched.push(entry.extension.clone());
            }
        }

        for synergy in &self.synergies {
            let all_active = synergy
                .extensions
                .iter()
                .all(|e| active.contains(e.as_str()));
            if all_active && synergy.when.holds(text) {
                breakdown.total += synergy.increment;
                breakdown.synergies.push(synergy.extensions.join("+"));
            }
        }

        breakdown.total += self.per_additional_extension * (active.len() - 1) as f64;
        breakdown
    }

    /// Add the bonus to `result`. The confidence is always capped at the
    /// ceiling; with extensions the reason also notes them.
    pub fn apply(
        &self,
        result: EvaluationResult,
        extensions: &[String],
        text: &str,
    ) -> EvaluationResult {
        if extensions.is_empty() {
            let capped = result.confidence.min(self.ceiling);
            return result.with_confidence(capped);
        }

        let breakdown = self.compute(extensions, text);
        let confidence = (result.confidence + breakdown.total).min(self.ceiling);
        let reason = format!(
            "{} (with {} extensions: [{}])",
            result.reason,
            extensions.len(),
            extensions.join(", ")
        );

        log::debug!(
            "Extension bonus {:.2} from {:?} (synergies {:?})",
            breakdown.total,
            breakdown.matched,
            breakdown.synergies
        );

        let mut result = result
            .with_confidence(confidence)
            .with_metadata("extension_bonus", breakdown.total)
            .with_metadata("bonus_extensions", breakdown.matched);
        result.reason = reason;
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_extensions_only_caps() {
        let table = ExtensionBonusTable::default();
        let result = EvaluationResult::accept(0.9, "base");
        assert_eq!(table.apply(result.clone(), &[], "ai startup"), result);

        let capped = table.apply(EvaluationResult::accept(1.0, "base"), &[], "ai startup");
        assert_eq!(capped.confidence, 0.98);
        assert_eq!(capped.reason, "base");
        assert!(!capped.metadata.contains_key("extension_bonus"));
    }

    #[test]
    fn test_single_extension_bonus() {
        let table = ExtensionBonusTable::default();
        let r = table.apply(
            EvaluationResult::accept(0.6, "Relevant"),
            &names(&["ai_research_focused"]),
            "new machine learning paper",
        );
        assert!((r.confidence - 0.7).abs() < 1e-9);
        assert_eq!(r.reason, "Relevant (with 1 extensions: [ai_research_focused])");
    }

    #[test]
    fn test_condition_must_hold() {
        let table = ExtensionBonusTable::default();
        let b = table.compute(&names(&["startup_ecosystem_focused"]), "garden party");
        assert_eq!(b.total, 0.0);
        assert!(b.matched.is_empty());
    }

    #[test]
    fn test_synergy_and_per_extension() {
        let table = ExtensionBonusTable::default();
        let b = table.compute(
            &names(&["ai_research_focused", "startup_ecosystem_focused"]),
            "ai startup closes funding",
        );
        assert_eq!(b.synergies, vec!["ai_research_focused+startup_ecosystem_focused"]);
        // 0.1 + 0.1 + 0.2 synergy + 0.05 for the second extension
        assert!((b.total - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_ai_creative_needs_both_groups() {
        let table = ExtensionBonusTable::default();
        let ext = names(&["ai_creative_applications"]);
        assert_eq!(table.compute(&ext, "ai benchmarks").total, 0.0);
        assert!((table.compute(&ext, "ai art generators").total - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_bonus_never_exceeds_ceiling() {
        let table = ExtensionBonusTable::default();
        let ext = names(&[
            "ai_research_focused",
            "startup_ecosystem_focused",
            "creative_tools_focused",
            "ai_creative_applications",
        ]);
        let mut r = EvaluationResult::accept(0.9, "base");
        for _ in 0..5 {
            r = table.apply(r, &ext, "ai startup funding for creative art tools");
            assert!(r.confidence <= 0.98);
        }
        assert_eq!(r.confidence, 0.98);
    }

    #[test]
    fn test_bonus_applies_to_rejections() {
        let table = ExtensionBonusTable::default();
        let r = table.apply(
            EvaluationResult::reject(0.5, "Too short"),
            &names(&["creative_tools_focused"]),
            "design",
        );
        assert!(!r.should_show);
        assert!((r.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_table_from_yaml() {
        let yaml = r#"
extensions:
  - extension: gardening_focused
    increment: 0.2
    when: [["compost", "soil"]]
"#;
        let table: ExtensionBonusTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.ceiling, 0.98);
        assert_eq!(table.per_additional_extension, 0.05);
        let b = table.compute(&names(&["gardening_focused"]), "rich soil");
        assert!((b.total - 0.2).abs() < 1e-9);
    }
}
