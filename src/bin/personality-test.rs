//! personality-test: run the personality/scenario matrix and write a report.
//!
//! # Environment Variables
//!
//! - `COMPLETIONS_API_KEY`: API key for delegated mode
//! - `COMPLETIONS_API_URL`: OpenAI-compatible base URL
//! - `PERSONALITY_TEST_MODE`: `mock` or `delegated`
//! - `RUST_LOG`: Tracing filter (default "info,personality_harness=debug")
//!
//! # Usage
//!
//! ```bash
//! personality-test --data testdata --output report.json
//! personality-test --mode delegated --concurrency 4 --personality tech_entrepreneur
//! personality-test --list
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use personality_harness::{
    strategy, CancellationToken, EvaluationDispatcher, FixtureLoader, FixtureSet, HarnessConfig,
    MatrixRunner, TestReport,
};

#[derive(Parser)]
#[command(author, version, about = "Evaluate scenarios against reference personalities", long_about = None)]
struct Cli {
    /// Fixture directory (personalities/, extensions/, scenarios/)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Report output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluation mode (mock, delegated)
    #[arg(short, long)]
    mode: Option<String>,

    /// Maximum cases in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Only run this base personality (repeatable)
    #[arg(long = "personality", value_name = "NAME")]
    personalities: Vec<String>,

    /// Only run this scenario (repeatable)
    #[arg(long = "scenario", value_name = "NAME")]
    scenarios: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List loaded personalities and scenarios, then exit
    #[arg(long)]
    list: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "debug"
    } else {
        "info,personality_harness=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

/// Defaults, then the config file, then the environment, then flags.
fn resolve_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid environment override")?;

    if let Some(data) = &cli.data {
        config.data_dir = data.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(mode) = &cli.mode {
        config.mode = mode.parse().context("Invalid --mode")?;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_listing(fixtures: &FixtureSet) {
    println!("Personalities:");
    for base in fixtures.composer.base_names() {
        let extensions = fixtures.composer.extension_names(base);
        if extensions.is_empty() {
            println!("  {}", base);
        } else {
            println!("  {} [{}]", base, extensions.join(", "));
        }
    }
    println!("Scenarios:");
    for scenario in &fixtures.scenarios {
        println!(
            "  {} ({}, {} expectations)",
            scenario.name,
            scenario.scenario_type(),
            scenario.personality_expectations.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    let fixtures = FixtureLoader::new(&config.data_dir)
        .load()
        .with_context(|| format!("Failed to load fixtures from {}", config.data_dir.display()))?;

    if cli.list {
        print_listing(&fixtures);
        return Ok(ExitCode::SUCCESS);
    }

    let strategy = strategy::from_config(&config).context("Failed to build evaluation strategy")?;
    tracing::info!("Evaluation mode: {}", strategy.name());
    let dispatcher = EvaluationDispatcher::with_default_handlers(strategy);

    let runner = MatrixRunner::new(fixtures.composer, fixtures.scenarios, dispatcher)
        .with_concurrency(config.concurrency)
        .with_case_timeout(config.case_timeout())
        .with_personality_filter(cli.personalities.iter().cloned())
        .with_scenario_filter(cli.scenarios.iter().cloned());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            tracing::warn!("Interrupt received, finishing in-flight cases");
            cancel.cancel();
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let started = Instant::now();
    let outcome = runner.run(&cancel).await;
    let report = TestReport::generate(outcome.results, outcome.skipped, started.elapsed());

    report
        .save(&config.output)
        .with_context(|| format!("Failed to write report to {}", config.output.display()))?;
    print!("{}", report);

    if outcome.cancelled {
        tracing::warn!("Run cancelled; report is partial");
    }

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
