//! Scoring of an actual result against its expectation.
//!
//! A coarse three-part rubric; expectation fixtures are tuned to it, so the
//! weights and tolerance are fixed:
//!
//! | Check | Points |
//! |-------|--------|
//! | `should_show` matches | 4 |
//! | confidence within 0.2 | 3 |
//! | state matches | 3 |
//!
//! The score is points / 10. A case succeeds at 0.7 or above.

use serde::{Deserialize, Serialize};

use crate::evaluation::EvaluationResult;
use crate::scenario::PersonalityExpectedOutcome;

pub const SUCCESS_THRESHOLD: f64 = 0.7;
pub const CONFIDENCE_TOLERANCE: f64 = 0.2;

const SHOW_POINTS: u8 = 4;
const CONFIDENCE_POINTS: u8 = 3;
const STATE_POINTS: u8 = 3;
const TOTAL_POINTS: f64 = 10.0;

/// Absorbs float noise at the tolerance boundary, e.g. `0.9 - 0.7`.
const EPSILON: f64 = 1e-9;

/// Which rubric checks passed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub should_show_match: bool,
    pub confidence_match: bool,
    pub state_match: bool,
    pub confidence_delta: f64,
}

impl ScoreBreakdown {
    pub fn compare(expected: &PersonalityExpectedOutcome, actual: &EvaluationResult) -> Self {
        let confidence_delta = (actual.confidence - expected.confidence).abs();
        Self {
            should_show_match: actual.should_show == expected.should_show,
            confidence_match: confidence_delta <= CONFIDENCE_TOLERANCE + EPSILON,
            state_match: actual.new_state == expected.state(),
            confidence_delta,
        }
    }

    pub fn points(&self) -> u8 {
        let mut points = 0;
        if self.should_show_match {
            points += SHOW_POINTS;
        }
        if self.confidence_match {
            points += CONFIDENCE_POINTS;
        }
        if self.state_match {
            points += STATE_POINTS;
        }
        points
    }

    pub fn score(&self) -> f64 {
        f64::from(self.points()) / TOTAL_POINTS
    }

    pub fn is_success(&self) -> bool {
        self.score() >= SUCCESS_THRESHOLD
    }

    /// One line per check, for reports.
    pub fn reasoning(&self) -> String {
        let mark = |ok: bool| if ok { "ok" } else { "MISMATCH" };
        format!(
            "should_show: {}; confidence: {} (delta {:.2}); state: {}",
            mark(self.should_show_match),
            mark(self.confidence_match),
            self.confidence_delta,
            mark(self.state_match)
        )
    }
}

/// Score `actual` against `expected`.
pub fn score(expected: &PersonalityExpectedOutcome, actual: &EvaluationResult) -> f64 {
    ScoreBreakdown::compare(expected, actual).score()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::VisibilityState;

    fn expected(should_show: bool, confidence: f64) -> PersonalityExpectedOutcome {
        PersonalityExpectedOutcome::new("tech_entrepreneur", should_show, confidence)
    }

    #[test]
    fn test_full_marks_within_tolerance() {
        let actual = EvaluationResult::accept(0.75, "ok");
        assert_eq!(score(&expected(true, 0.9), &actual), 1.0);
    }

    #[test]
    fn test_confidence_miss_is_still_success() {
        let actual = EvaluationResult::accept(0.5, "ok");
        let b = ScoreBreakdown::compare(&expected(true, 0.9), &actual);
        assert_eq!(b.score(), 0.7);
        assert!(b.is_success());
        assert!(b.reasoning().contains("confidence: MISMATCH"));
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let actual = EvaluationResult::accept(0.7, "ok");
        assert_eq!(score(&expected(true, 0.9), &actual), 1.0);
    }

    #[test]
    fn test_wrong_verdict_fails() {
        let actual = EvaluationResult::reject(0.9, "no");
        let b = ScoreBreakdown::compare(&expected(true, 0.9), &actual);
        assert_eq!(b.points(), 3);
        assert!(!b.is_success());
    }

    #[test]
    fn test_explicit_expected_state_is_used() {
        let mut e = expected(true, 0.9);
        e.expected_state = Some(VisibilityState::Hidden);
        let actual = EvaluationResult::accept(0.9, "ok");
        assert_eq!(score(&e, &actual), 0.7);
    }
}
