//! Aggregated report over a matrix run.
//!
//! Aggregates are independent of result order: scores are summed in sorted
//! order and best/worst ties go to the lexicographically smallest name.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::matrix::{SkippedCase, TestResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
}

/// Per base personality, across all extension sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityReport {
    pub total: usize,
    pub passed: usize,
    pub average_score: f64,
    pub best_scenario: Option<String>,
    pub worst_scenario: Option<String>,
}

/// Per scenario; personalities are composed names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub total: usize,
    pub passed: usize,
    pub average_score: f64,
    pub best_personality: Option<String>,
    pub worst_personality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: TestSummary,
    pub personality_results: BTreeMap<String, PersonalityReport>,
    pub scenario_results: BTreeMap<String, ScenarioReport>,
    pub results: Vec<TestResult>,
    #[serde(default)]
    pub skipped: Vec<SkippedCase>,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Aggregation helpers
// ---------------------------------------------------------------------------

fn average(scores: &mut [f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.sort_by(f64::total_cmp);
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Highest and lowest scoring names; ties go to the smaller name.
fn best_and_worst<'a>(
    entries: impl Iterator<Item = (&'a str, f64)>,
) -> (Option<String>, Option<String>) {
    let mut best: Option<(&str, f64)> = None;
    let mut worst: Option<(&str, f64)> = None;

    for (name, score) in entries {
        let beats_best = best.map_or(true, |(n, s)| match score.total_cmp(&s) {
            Ordering::Greater => true,
            Ordering::Equal => name < n,
            Ordering::Less => false,
        });
        if beats_best {
            best = Some((name, score));
        }
        let beats_worst = worst.map_or(true, |(n, s)| match score.total_cmp(&s) {
            Ordering::Less => true,
            Ordering::Equal => name < n,
            Ordering::Greater => false,
        });
        if beats_worst {
            worst = Some((name, score));
        }
    }

    (
        best.map(|(n, _)| n.to_string()),
        worst.map(|(n, _)| n.to_string()),
    )
}

impl TestSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let passed = results.iter().filter(|r| r.success).count();
        let mut scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        let highest = scores.iter().copied().fold(f64::MIN, f64::max);
        let lowest = scores.iter().copied().fold(f64::MAX, f64::min);
        Self {
            total_tests: results.len(),
            passed_tests: passed,
            failed_tests: results.len() - passed,
            average_score: average(&mut scores),
            highest_score: highest,
            lowest_score: lowest,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            self.passed_tests as f64 / self.total_tests as f64
        }
    }
}

impl TestReport {
    pub fn generate(results: Vec<TestResult>, skipped: Vec<SkippedCase>, duration: Duration) -> Self {
        let summary = TestSummary::from_results(&results);

        let mut by_personality: BTreeMap<&str, Vec<&TestResult>> = BTreeMap::new();
        let mut by_scenario: BTreeMap<&str, Vec<&TestResult>> = BTreeMap::new();
        for r in &results {
            by_personality.entry(r.base_personality.as_str()).or_default().push(r);
            by_scenario.entry(r.scenario_name.as_str()).or_default().push(r);
        }

        let personality_results = by_personality
            .into_iter()
            .map(|(name, group)| {
                let mut scores: Vec<f64> = group.iter().map(|r| r.score).collect();
                let (best, worst) =
                    best_and_worst(group.iter().map(|r| (r.scenario_name.as_str(), r.score)));
                let report = PersonalityReport {
                    total: group.len(),
                    passed: group.iter().filter(|r| r.success).count(),
                    average_score: average(&mut scores),
                    best_scenario: best,
                    worst_scenario: worst,
                };
                (name.to_string(), report)
            })
            .collect();

        let scenario_results = by_scenario
            .into_iter()
            .map(|(name, group)| {
                let mut scores: Vec<f64> = group.iter().map(|r| r.score).collect();
                let (best, worst) =
                    best_and_worst(group.iter().map(|r| (r.personality_name.as_str(), r.score)));
                let report = ScenarioReport {
                    total: group.len(),
                    passed: group.iter().filter(|r| r.success).count(),
                    average_score: average(&mut scores),
                    best_personality: best,
                    worst_personality: worst,
                };
                (name.to_string(), report)
            })
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            summary,
            personality_results,
            scenario_results,
            results,
            skipped,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed_tests > 0
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Report saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "Personality test report ({})", self.run_id)?;
        writeln!(
            f,
            "  Total: {}  Passed: {}  Failed: {}  Skipped: {}  ({:.1}% pass, {} ms)",
            s.total_tests,
            s.passed_tests,
            s.failed_tests,
            self.skipped.len(),
            s.pass_rate() * 100.0,
            self.duration_ms
        )?;
        writeln!(
            f,
            "  Scores: avg {:.2}  high {:.2}  low {:.2}",
            s.average_score, s.highest_score, s.lowest_score
        )?;

        if !self.personality_results.is_empty() {
            writeln!(f, "Personalities:")?;
            for (name, p) in &self.personality_results {
                writeln!(
                    f,
                    "  {}: {}/{} passed, avg {:.2} (best: {}, worst: {})",
                    name,
                    p.passed,
                    p.total,
                    p.average_score,
                    p.best_scenario.as_deref().unwrap_or("-"),
                    p.worst_scenario.as_deref().unwrap_or("-")
                )?;
            }
        }

        if !self.scenario_results.is_empty() {
            writeln!(f, "Scenarios:")?;
            for (name, sc) in &self.scenario_results {
                writeln!(
                    f,
                    "  {}: {}/{} passed, avg {:.2}",
                    name, sc.passed, sc.total, sc.average_score
                )?;
            }
        }

        let failures: Vec<&TestResult> = self.results.iter().filter(|r| !r.success).collect();
        if !failures.is_empty() {
            writeln!(f, "Failures:")?;
            for r in failures {
                writeln!(
                    f,
                    "  {} on {}: score {:.1} - {}",
                    r.personality_name, r.scenario_name, r.score, r.reasoning
                )?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
