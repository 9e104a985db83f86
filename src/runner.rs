use flume::SendError;
use flume::Sender;
use thiserror::Error;

use crate::client::ApiClient;
use crate::client::ApiRequest;
use crate::client::CapturedResponse;
use crate::decode::Shape;
use crate::suite::Case;
use crate::suite::Check;
use crate::suite::Plan;
use crate::suite::Suite;

#[derive(Error, Debug)]
// TODO: box the RunnerResult carried by the channel error
#[allow(clippy::large_enum_variant)]
pub enum RunnerError {
    #[error("channel error")]
    ChannelError(#[from] SendError<RunnerResult>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Test,
    Teardown,
}

#[derive(Debug)]
pub enum Outcome {
    Response(CapturedResponse),
    Failed(String),
    Skipped(String),
}

#[derive(Debug)]
pub struct RunnerResult {
    pub suite: String,
    pub name: String,
    pub phase: Phase,
    pub request: ApiRequest,
    /// `None` for setup and teardown, they only assert the call went through.
    pub expectation: Option<(Shape, Check)>,
    pub outcome: Outcome,
}

/// Runs every suite of the plan, one call at a time, in order.
pub async fn run_tests<C: ApiClient>(
    client: &C,
    plan: Plan,
    tx: Sender<RunnerResult>,
) -> Result<(), RunnerError> {
    for suite in plan.suites {
        run_suite(client, suite, &tx).await?;
    }

    Ok(())
}

async fn run_suite<C: ApiClient>(
    client: &C,
    suite: Suite,
    tx: &Sender<RunnerResult>,
) -> Result<(), RunnerError> {
    let Suite {
        name,
        setup,
        cases,
        teardown,
        ..
    } = suite;

    tracing::info!(suite = %name, "starting suite");

    let body = run_setup_and_cases(client, &name, setup, cases, tx).await;

    // Teardown runs no matter how the tests went, and only once.
    let sent = match teardown {
        Some(request) => {
            let outcome = perform(client, &request).await;
            tx.send_async(RunnerResult {
                suite: name.clone(),
                name: "suite teardown".into(),
                phase: Phase::Teardown,
                request,
                expectation: None,
                outcome,
            })
            .await
        }
        None => Ok(()),
    };

    tracing::info!(suite = %name, "finished suite");

    body?;
    sent?;
    Ok(())
}

async fn run_setup_and_cases<C: ApiClient>(
    client: &C,
    suite: &str,
    setup: Option<ApiRequest>,
    cases: Vec<Case>,
    tx: &Sender<RunnerResult>,
) -> Result<(), RunnerError> {
    let mut setup_failure = None;

    if let Some(request) = setup {
        let outcome = perform(client, &request).await;
        if let Outcome::Failed(error) = &outcome {
            setup_failure = Some(error.clone());
        }

        tx.send_async(RunnerResult {
            suite: suite.into(),
            name: "suite setup".into(),
            phase: Phase::Setup,
            request,
            expectation: None,
            outcome,
        })
        .await?;
    }

    for case in cases {
        for test in case.tests {
            // Every test gets its own fresh response.
            let outcome = match &setup_failure {
                Some(error) => Outcome::Skipped(format!("suite setup failed: {error}")),
                None => perform(client, &case.request).await,
            };

            tx.send_async(RunnerResult {
                suite: suite.into(),
                name: format!("{}: {}", case.name, test.name),
                phase: Phase::Test,
                request: case.request.clone(),
                expectation: Some((case.shape, test.check)),
                outcome,
            })
            .await?;
        }
    }

    Ok(())
}

async fn perform<C: ApiClient>(client: &C, request: &ApiRequest) -> Outcome {
    match client.call(request).await {
        Ok(response) => Outcome::Response(response),
        Err(error) => {
            tracing::warn!(method = %request.method, url = %request.url, %error, "api call failed");
            Outcome::Failed(error.to_string())
        }
    }
}
