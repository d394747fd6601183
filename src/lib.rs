//! # Personality Harness
//!
//! Composes synthetic reference personalities from a base plus ordered
//! extensions, evaluates content scenarios against them and scores the
//! verdicts against per-personality expectations.
//!
//! ```text
//! FixtureLoader ─► PersonalityComposer ─┐
//!              └─► Vec<Scenario> ───────┼─► MatrixRunner ─► TestReport
//!       EvaluationDispatcher ───────────┘
//!         (handlers + Mock | Delegated strategy)
//! ```
//!
//! Evaluation is either a deterministic keyword heuristic (mock) or a
//! delegated call to an OpenAI-compatible completion endpoint.

pub mod cancellation;
pub mod config;
pub mod content;
pub mod error;
pub mod evaluation;
pub mod fixtures;
pub mod llms;
pub mod matrix;
pub mod persona;
pub mod report;
pub mod scenario;
pub mod scoring;
pub mod strategy;

pub use cancellation::CancellationToken;
pub use config::{CompletionConfig, HarnessConfig};
pub use content::{Content, ScenarioType};
pub use error::{HarnessError, Result};
pub use evaluation::{
    EvaluationDispatcher, EvaluationEnvironment, EvaluationHandler, EvaluationResult,
    VisibilityState,
};
pub use fixtures::{FixtureLoader, FixtureSet};
pub use matrix::{MatrixOutcome, MatrixRunner, SkippedCase, TestResult};
pub use persona::{
    BasePersonality, PersonalityComposer, PersonalityExtension, ReferencePersonality,
};
pub use report::TestReport;
pub use scenario::{PersonalityExpectedOutcome, Scenario, ScenarioBuilder};
pub use scoring::{score, ScoreBreakdown};
pub use strategy::{EvaluationMode, EvaluationStrategy};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
