//! Matrix runner: every personality x extension set x scenario that has an
//! expectation, evaluated and scored.
//!
//! For each personality and scenario the runner plans:
//!
//! 1. the base personality, if an extension-free expectation exists
//! 2. each registered extension on its own, if a lookup for it succeeds
//!    (falling back to the extension-free record)
//! 3. each multi-extension expectation, if every named extension is
//!    registered for the personality; otherwise the combination is skipped
//!
//! Per-case failures become [`SkippedCase`] entries; they never abort the
//! run. Cancellation is checked before every case, and whatever finished
//! before it is returned.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cancellation::CancellationToken;
use crate::error::{HarnessError, Result};
use crate::evaluation::{EvaluationDispatcher, EvaluationEnvironment, EvaluationResult};
use crate::persona::PersonalityComposer;
use crate::scenario::{PersonalityExpectedOutcome, Scenario};
use crate::scoring::ScoreBreakdown;

// ============================================================================
// Records
// ============================================================================

/// One scored evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Composed name, e.g. `tech_entrepreneur_ai_research_focused`.
    pub personality_name: String,
    pub base_personality: String,
    #[serde(default)]
    pub extension_names: Vec<String>,
    pub scenario_name: String,
    pub success: bool,
    pub score: f64,
    pub actual: EvaluationResult,
    pub expected: PersonalityExpectedOutcome,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

/// A planned case that produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCase {
    pub personality: String,
    pub extensions: Vec<String>,
    pub scenario: String,
    pub reason: String,
}

/// One planned evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixCase {
    pub personality: String,
    pub extensions: Vec<String>,
    /// Index into the runner's scenario list.
    pub scenario_index: usize,
    pub scenario: String,
    pub expected: PersonalityExpectedOutcome,
}

impl MatrixCase {
    fn skip(&self, reason: impl Into<String>) -> SkippedCase {
        SkippedCase {
            personality: self.personality.clone(),
            extensions: self.extensions.clone(),
            scenario: self.scenario.clone(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixPlan {
    pub cases: Vec<MatrixCase>,
    /// Gated combinations.
    pub skipped: Vec<SkippedCase>,
}

#[derive(Debug, Clone, Default)]
pub struct MatrixOutcome {
    pub results: Vec<TestResult>,
    pub skipped: Vec<SkippedCase>,
    /// True if cancellation dropped or interrupted at least one case.
    pub cancelled: bool,
}

impl MatrixOutcome {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

// ============================================================================
// Runner
// ============================================================================

#[derive(Debug)]
pub struct MatrixRunner {
    composer: PersonalityComposer,
    scenarios: Vec<Scenario>,
    dispatcher: EvaluationDispatcher,
    concurrency: usize,
    case_timeout: Option<Duration>,
    personality_filter: Option<BTreeSet<String>>,
    scenario_filter: Option<BTreeSet<String>>,
}

impl MatrixRunner {
    pub fn new(
        composer: PersonalityComposer,
        scenarios: Vec<Scenario>,
        dispatcher: EvaluationDispatcher,
    ) -> Self {
        Self {
            composer,
            scenarios,
            dispatcher,
            concurrency: 1,
            case_timeout: None,
            personality_filter: None,
            scenario_filter: None,
        }
    }

    /// Maximum in-flight cases; 0 is treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_case_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.case_timeout = timeout;
        self
    }

    /// Only run these base personalities. An empty filter means all.
    pub fn with_personality_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        self.personality_filter = (!names.is_empty()).then_some(names);
        self
    }

    /// Only run these scenarios. An empty filter means all.
    pub fn with_scenario_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        self.scenario_filter = (!names.is_empty()).then_some(names);
        self
    }

    pub fn composer(&self) -> &PersonalityComposer {
        &self.composer
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    fn selected_personality(&self, name: &str) -> bool {
        self.personality_filter
            .as_ref()
            .map_or(true, |f| f.contains(name))
    }

    fn selected_scenario(&self, name: &str) -> bool {
        self.scenario_filter
            .as_ref()
            .map_or(true, |f| f.contains(name))
    }

    /// Enumerate the cases to run, without evaluating anything.
    pub fn plan(&self) -> MatrixPlan {
        let mut plan = MatrixPlan::default();

        for base in self.composer.base_names().filter(|b| self.selected_personality(b)) {
            let available = self.composer.extension_names(base);

            for (index, scenario) in self.scenarios.iter().enumerate() {
                if !self.selected_scenario(&scenario.name) {
                    continue;
                }
                let case = |extensions: Vec<String>, expected: &PersonalityExpectedOutcome| {
                    MatrixCase {
                        personality: base.to_string(),
                        extensions,
                        scenario_index: index,
                        scenario: scenario.name.clone(),
                        expected: expected.clone(),
                    }
                };

                if let Some(expected) = scenario.expected_outcome_for::<&str>(base, &[]) {
                    plan.cases.push(case(Vec::new(), expected));
                }

                for ext in &available {
                    if let Some(expected) = scenario.expected_outcome_for(base, &[*ext]) {
                        plan.cases.push(case(vec![ext.to_string()], expected));
                    }
                }

                for expected in scenario.multi_extension_expectations(base) {
                    let extensions = expected.distinct_extensions();
                    let missing: Vec<&str> = extensions
                        .iter()
                        .map(String::as_str)
                        .filter(|e| !self.composer.has_extension(base, e))
                        .collect();
                    let planned = case(extensions.clone(), expected);
                    if missing.is_empty() {
                        plan.cases.push(planned);
                    } else {
                        plan.skipped.push(planned.skip(format!(
                            "extensions not available: {}",
                            missing.join(", ")
                        )));
                    }
                }
            }
        }

        plan
    }

    /// Run every planned case.
    pub async fn run(&self, cancel: &CancellationToken) -> MatrixOutcome {
        let plan = self.plan();
        log::info!(
            "Matrix run: {} cases planned, {} gated, concurrency {}",
            plan.cases.len(),
            plan.skipped.len(),
            self.concurrency
        );
        for gated in &plan.skipped {
            log::warn!(
                "Skipping {} {:?} on '{}': {}",
                gated.personality,
                gated.extensions,
                gated.scenario,
                gated.reason
            );
        }

        let results = Mutex::new(Vec::with_capacity(plan.cases.len()));
        let skipped = Mutex::new(plan.skipped);
        let interrupted = AtomicBool::new(false);
        let (results_ref, skipped_ref, interrupted_ref) = (&results, &skipped, &interrupted);

        stream::iter(plan.cases)
            .for_each_concurrent(self.concurrency, move |case| async move {
                if cancel.is_cancelled() {
                    interrupted_ref.store(true, Ordering::SeqCst);
                    return;
                }
                match self.run_case(&case, cancel).await {
                    Ok(result) => {
                        log::debug!(
                            "{} on '{}': score {:.1} ({})",
                            result.personality_name,
                            result.scenario_name,
                            result.score,
                            if result.success { "pass" } else { "fail" }
                        );
                        results_ref.lock().push(result);
                    }
                    Err(err) => {
                        if matches!(err, HarnessError::Cancelled) {
                            interrupted_ref.store(true, Ordering::SeqCst);
                        } else {
                            log::warn!(
                                "Case {} {:?} on '{}' failed: {}",
                                case.personality,
                                case.extensions,
                                case.scenario,
                                err
                            );
                        }
                        skipped_ref.lock().push(case.skip(err.to_string()));
                    }
                }
            })
            .await;

        let outcome = MatrixOutcome {
            results: results.into_inner(),
            skipped: skipped.into_inner(),
            cancelled: interrupted.into_inner(),
        };
        log::info!(
            "Matrix finished: {} passed, {} failed, {} skipped{}",
            outcome.passed(),
            outcome.failed(),
            outcome.skipped.len(),
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        outcome
    }

    async fn run_case(&self, case: &MatrixCase, cancel: &CancellationToken) -> Result<TestResult> {
        let scenario = self
            .scenarios
            .get(case.scenario_index)
            .ok_or_else(|| HarnessError::Config(format!("unknown scenario '{}'", case.scenario)))?;
        let personality = self.composer.compose(&case.personality, &case.extensions)?;
        let env = EvaluationEnvironment::new(scenario.context.clone(), cancel.clone())
            .with_deadline(self.case_timeout);

        let actual = self.dispatcher.dispatch(scenario, &personality, &env).await?;
        let breakdown = ScoreBreakdown::compare(&case.expected, &actual);

        Ok(TestResult {
            personality_name: personality.name,
            base_personality: personality.base_name,
            extension_names: personality.extension_names,
            scenario_name: scenario.name.clone(),
            success: breakdown.is_success(),
            score: breakdown.score(),
            actual,
            expected: case.expected.clone(),
            reasoning: breakdown.reasoning(),
            timestamp: Utc::now(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
