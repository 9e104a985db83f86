#![allow(clippy::result_large_err)]
#![allow(dead_code)]

use clap::Parser;
use flume::SendError;
use miette::Diagnostic;
use miette::Result;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::asserter::Asserter;
use crate::asserter::Report;
use crate::cli::Cli;
use crate::client::HttpClient;
use crate::config::ConfigError;
use crate::config::RunConfig;
use crate::config::Settings;
use crate::config::resolve;
use crate::outputter::OutPutter;
use crate::outputter::Summary;
use crate::parser::FixtureError;
use crate::parser::load_fixture;
use crate::runner::RunnerError;
use crate::runner::RunnerResult;
use crate::runner::run_tests;
use crate::suite::Plan;
use crate::suite::build;

mod asserter;
mod cli;
mod client;
mod config;
mod decode;
mod fixture;
mod outputter;
mod parser;
mod runner;
mod suite;

#[derive(Error, Debug, Diagnostic)]
pub enum TestQuestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fixture(#[from] FixtureError),

    #[error("The test pipeline stopped early: {0}")]
    Pipeline(String),

    #[error("{failed} of {total} tests failed")]
    Failures { failed: usize, total: usize },
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("compiler_quest=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Reads the command line and run file, loads every fixture and builds the
/// plan. Nothing is sent to the API before all of this has succeeded.
fn load_and_validate_config() -> Result<(Settings, Plan), TestQuestError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    let settings = resolve(&cli, config)?;

    let suites = settings
        .suites
        .iter()
        .map(|entry| {
            load_fixture(entry.kind, entry.fixture.as_deref(), entry.overlay.as_deref())
                .inspect_err(|error| {
                    tracing::error!(suite = %entry.kind, %error, "fixture unusable");
                })
                .map(|fixture| build(&fixture))
        })
        .collect::<Result<Vec<_>, FixtureError>>()?;

    Ok((settings, Plan { suites }))
}

/// Spawns the runner, asserter and outputter, connected by flume channels.
fn run_pipeline_tasks(
    client: HttpClient,
    plan: Plan,
) -> (
    JoinHandle<Result<(), RunnerError>>,
    JoinHandle<Result<(), SendError<Report>>>,
    JoinHandle<Summary>,
) {
    let n_tests = plan.n_tests();
    let (runner_tx, asserter_rx) = flume::unbounded::<RunnerResult>();
    let (asserter_tx, outputter_rx) = flume::unbounded::<Report>();

    let outputter_jh = tokio::spawn(async move { OutPutter::start(outputter_rx, n_tests).await });

    let runner_jh = tokio::spawn(async move { run_tests(&client, plan, runner_tx).await });

    let asserter_jh = tokio::spawn(async move { Asserter::run(asserter_rx, asserter_tx).await });

    (runner_jh, asserter_jh, outputter_jh)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let (settings, plan) = load_and_validate_config()?;

    tracing::debug!(
        base_url = ?settings.base_url,
        transport_errors = ?settings.transport_errors,
        suites = plan.suites.len(),
        "configuration loaded"
    );

    let client = HttpClient::new(settings.base_url, settings.transport_errors);

    let (runner_jh, asserter_jh, outputter_jh) = run_pipeline_tasks(client, plan);
    let (runner, asserter, outputter) = futures::join!(runner_jh, asserter_jh, outputter_jh);

    let summary = outputter.map_err(|e| TestQuestError::Pipeline(e.to_string()))?;

    match runner {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(TestQuestError::Pipeline(e.to_string()).into()),
        Err(e) => return Err(TestQuestError::Pipeline(e.to_string()).into()),
    }
    match asserter {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(TestQuestError::Pipeline(e.to_string()).into()),
        Err(e) => return Err(TestQuestError::Pipeline(e.to_string()).into()),
    }

    if summary.failed > 0 {
        return Err(TestQuestError::Failures {
            failed: summary.failed,
            total: summary.total(),
        }
        .into());
    }

    Ok(())
}
