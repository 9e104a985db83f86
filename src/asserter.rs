use core::fmt;
use std::fmt::Display;

use flume::Receiver;
use flume::SendError;
use flume::Sender;
use reqwest::StatusCode;

use crate::decode::Decoded;
use crate::decode::Shape;
use crate::decode::decode;
use crate::runner::Outcome;
use crate::runner::Phase;
use crate::runner::RunnerResult;
use crate::suite::Check;

pub struct Asserter {}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// Setup and teardown only need the call to go through.
    CallSucceeds,
    Check(Check),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Actual {
    Status(Option<StatusCode>),
    Value(String),
    DecodeFailed {
        error: String,
        status: Option<StatusCode>,
        body: String,
    },
    ShapeMismatch(Shape),
    RequestFailed(String),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct AssertResult {
    pub status: TestResult,
    pub expected: Expected,
    pub actual: Actual,
}

/// What the outputter gets for every finished test.
#[derive(Debug, Clone)]
pub struct Report {
    pub suite: String,
    pub name: String,
    pub phase: Phase,
    pub method: String,
    pub url: String,
    pub result: AssertResult,
}

impl Display for AssertResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.actual) {
            (TestResult::Pass, actual) => {
                write!(
                    f,
                    "{} {} {}",
                    console::style("✔").green().bold(),
                    console::style("PASS!").green().bold(),
                    actual
                )
            }

            (TestResult::Skip, Actual::Skipped(reason)) => {
                write!(
                    f,
                    "{} {} {}",
                    console::style("⚠").yellow(),
                    console::style("SKIPPED").yellow().bold(),
                    console::style(reason).dim()
                )
            }

            (TestResult::Fail, Actual::RequestFailed(err)) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  {} {}",
                    console::style("Request failed with error:").red(),
                    console::style(err).red().bold()
                )
            }

            (
                TestResult::Fail,
                Actual::DecodeFailed {
                    error,
                    status,
                    body,
                },
            ) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  {} {}",
                    console::style("Response did not decode:").red(),
                    console::style(error).red().bold()
                )?;
                if let Some(status) = status {
                    writeln!(f, "  {} {}", console::style("Status:").yellow(), status)?;
                }
                if body.is_empty() {
                    writeln!(f, "  {}", console::style("<empty body>").red().bold())
                } else {
                    writeln!(f, "  {}", console::style("Body:").yellow())?;
                    writeln!(f, "{}", console::style(body).dim())
                }
            }

            (TestResult::Fail, actual) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  Expected: {}",
                    console::style(&self.expected).green()
                )?;
                writeln!(f, "  Actual:   {}", console::style(actual).red())
            }

            (TestResult::Skip, actual) => {
                write!(
                    f,
                    "{} {} {}",
                    console::style("⚠").yellow(),
                    console::style("SKIPPED").yellow().bold(),
                    actual
                )
            }
        }
    }
}

impl Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::CallSucceeds => write!(f, "call succeeds"),
            Expected::Check(check) => write!(f, "{check}"),
        }
    }
}

impl Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::RecordCount(n) => write!(f, "{n} records"),
            Check::VertexCount(n) => write!(f, "{n} vertexes"),
            Check::InstanceName(name) => write!(f, "name {name:?}"),
            Check::DependentInstances(deps) => write!(f, "dependent_instance {deps:?}"),
            Check::Result(result) => write!(f, "result {result:?}"),
            Check::Message(message) => write!(f, "message {message:?}"),
            Check::Data(data) => write!(f, "data {data:?}"),
            Check::DataTypeCount {
                data_type,
                expected,
            } => write!(f, "{expected} inputs of type {data_type}"),
            Check::NamesKnown(names) => {
                let names: Vec<&str> = names.keys().map(String::as_str).collect();
                write!(f, "only names from [{}]", names.join(", "))
            }
            Check::ServiceUrls(urls) => write!(f, "service urls {urls:?} in any order"),
            Check::MetadataCount(n) => write!(f, "{n} metadata entries on the first model"),
        }
    }
}

impl Display for Actual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actual::Status(Some(status)) => write!(f, "Got status {status}"),
            Actual::Status(None) => write!(f, "Call returned nothing"),
            Actual::Value(value) => write!(f, "Got {value}"),
            Actual::DecodeFailed { error, .. } => write!(f, "Response did not decode: {error}"),
            Actual::ShapeMismatch(shape) => write!(f, "Check does not apply to a {shape}"),
            Actual::RequestFailed(_) => write!(f, "Request failed"),
            Actual::Skipped(reason) => write!(f, "Skipped: {reason}"),
        }
    }
}

pub trait Assert {
    fn assert(&self) -> AssertResult;
}

impl Assert for RunnerResult {
    fn assert(&self) -> AssertResult {
        let expected = match &self.expectation {
            Some((_, check)) => Expected::Check(check.clone()),
            None => Expected::CallSucceeds,
        };

        let (status, actual) = match (&self.outcome, &self.expectation) {
            (Outcome::Skipped(reason), _) => (TestResult::Skip, Actual::Skipped(reason.clone())),
            (Outcome::Failed(error), _) => (TestResult::Fail, Actual::RequestFailed(error.clone())),
            (Outcome::Response(response), None) => {
                (TestResult::Pass, Actual::Status(response.status))
            }
            (Outcome::Response(response), Some((shape, check))) => {
                match decode(*shape, &response.body) {
                    Ok(decoded) => evaluate(check, &decoded),
                    Err(error) => (
                        TestResult::Fail,
                        Actual::DecodeFailed {
                            error: error.to_string(),
                            status: response.status,
                            body: response.body_text().into_owned(),
                        },
                    ),
                }
            }
        };

        AssertResult {
            status,
            expected,
            actual,
        }
    }
}

impl Asserter {
    pub async fn run(
        rx: Receiver<RunnerResult>,
        output_tx: Sender<Report>,
    ) -> Result<(), SendError<Report>> {
        while let Ok(msg) = rx.recv_async().await {
            let result = msg.assert();

            output_tx
                .send_async(Report {
                    suite: msg.suite,
                    name: msg.name,
                    phase: msg.phase,
                    method: msg.request.method.to_string(),
                    url: msg.request.url,
                    result,
                })
                .await?;
        }

        Ok(())
    }
}

pub fn evaluate(check: &Check, decoded: &Decoded) -> (TestResult, Actual) {
    match (check, decoded) {
        (Check::RecordCount(expected), Decoded::InstanceList(records)) => {
            count(*expected, records.len(), "records")
        }
        (Check::VertexCount(expected), Decoded::Instance(instance)) => {
            count(*expected, instance.vertexes.len(), "vertexes")
        }
        (Check::InstanceName(expected), Decoded::Instance(instance)) => {
            equal(expected, &instance.name)
        }
        (Check::DependentInstances(expected), Decoded::Instance(instance)) => {
            equal(expected, &instance.dependent_instance)
        }
        (Check::Data(expected), Decoded::StringList(envelope)) => equal(expected, &envelope.data),
        (Check::Result(expected), decoded) if decoded.result().is_some() => {
            equal(&expected.as_str(), &decoded.result().unwrap_or_default())
        }
        (Check::Message(expected), decoded) if decoded.message().is_some() => {
            equal(&expected.as_str(), &decoded.message().unwrap_or_default())
        }
        (
            Check::DataTypeCount {
                data_type,
                expected,
            },
            Decoded::Inputs(inputs),
        ) => {
            let found = inputs
                .data
                .values()
                .flatten()
                .filter(|input| input.data_type_name == *data_type)
                .count();

            count(*expected, found, &format!("inputs of type {data_type}"))
        }
        (Check::NamesKnown(names), Decoded::Inputs(inputs)) => {
            let unknown: Vec<&str> = inputs
                .data
                .values()
                .flatten()
                .map(|input| input.name.as_str())
                .filter(|name| !names.contains_key(*name))
                .collect();

            if unknown.is_empty() {
                (TestResult::Pass, Actual::Value("only known names".into()))
            } else {
                (
                    TestResult::Fail,
                    Actual::Value(format!("unexpected names [{}]", unknown.join(", "))),
                )
            }
        }
        (Check::ServiceUrls(expected), Decoded::Models(models)) => {
            let actual = models.data.service_urls();
            let status = if same_elements(expected, &actual) {
                TestResult::Pass
            } else {
                TestResult::Fail
            };

            (status, Actual::Value(format!("service urls {actual:?}")))
        }
        (Check::MetadataCount(expected), Decoded::Metadata(metadata)) => {
            match metadata.data.models.first() {
                Some(model) => count(*expected, model.metadata.len(), "metadata entries"),
                None => (TestResult::Fail, Actual::Value("no models".into())),
            }
        }
        (_, decoded) => (TestResult::Fail, Actual::ShapeMismatch(decoded.shape())),
    }
}

fn count(expected: usize, actual: usize, what: &str) -> (TestResult, Actual) {
    let status = if expected == actual {
        TestResult::Pass
    } else {
        TestResult::Fail
    };

    (status, Actual::Value(format!("{actual} {what}")))
}

fn equal<T: PartialEq + fmt::Debug>(expected: &T, actual: &T) -> (TestResult, Actual) {
    let status = if expected == actual {
        TestResult::Pass
    } else {
        TestResult::Fail
    };

    (status, Actual::Value(format!("{actual:?}")))
}

/// Same elements regardless of order. A `None` never matches.
fn same_elements(expected: &[String], actual: &[Option<String>]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }

    let mut remaining: Vec<&Option<String>> = actual.iter().collect();
    for item in expected {
        match remaining
            .iter()
            .position(|candidate| candidate.as_deref() == Some(item.as_str()))
        {
            Some(index) => {
                remaining.swap_remove(index);
            }
            None => return false,
        }
    }

    true
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use reqwest::Method;
    use reqwest::StatusCode;

    use crate::asserter::Actual;
    use crate::asserter::Assert;
    use crate::asserter::Asserter;
    use crate::asserter::TestResult;
    use crate::asserter::evaluate;
    use crate::client::ApiRequest;
    use crate::client::CapturedResponse;
    use crate::decode::Shape;
    use crate::decode::decode;
    use crate::runner::Outcome;
    use crate::runner::Phase;
    use crate::runner::RunnerResult;
    use crate::suite::Check;

    fn check(shape: Shape, check: Check, body: &str) -> (TestResult, Actual) {
        evaluate(&check, &decode(shape, body.as_bytes()).unwrap())
    }

    fn result(expectation: Option<(Shape, Check)>, outcome: Outcome) -> RunnerResult {
        RunnerResult {
            suite: "Service Orchestrator APIs".into(),
            name: "GET instances: should return the expected number of instances".into(),
            phase: Phase::Test,
            request: ApiRequest::new(Method::GET, "http://host/instances"),
            expectation,
            outcome,
        }
    }

    fn response(body: &str) -> Outcome {
        Outcome::Response(CapturedResponse {
            status: Some(StatusCode::OK),
            body: body.as_bytes().to_vec(),
        })
    }

    #[test]
    fn uid_count_matches() {
        let (status, _) = check(
            Shape::InstanceList,
            Check::RecordCount(2),
            r#"[{"uid":"a"},{"uid":"b"}]"#,
        );
        assert_eq!(status, TestResult::Pass);
    }

    #[test]
    fn uid_count_mismatch_reports_lengths() {
        for (body, got) in [
            (r#"[{"uid":"a"}]"#, "1 records"),
            (r#"[{"uid":"a"},{"uid":"b"},{"uid":"c"}]"#, "3 records"),
        ] {
            let (status, actual) = check(Shape::InstanceList, Check::RecordCount(2), body);
            assert_eq!(status, TestResult::Fail);
            assert_eq!(actual, Actual::Value(got.into()));
        }
    }

    #[test]
    fn empty_dependent_instance_is_not_a_single_empty_string() {
        let expected = Check::DependentInstances(vec![String::new()]);

        let (status, _) = check(
            Shape::Instance,
            expected.clone(),
            r#"{"dependent_instance": [""]}"#,
        );
        assert_eq!(status, TestResult::Pass);

        let (status, actual) = check(Shape::Instance, expected, r#"{"dependent_instance": []}"#);
        assert_eq!(status, TestResult::Fail);
        assert_eq!(actual, Actual::Value("[]".into()));
    }

    #[test]
    fn zero_expected_counts_pass_on_empty_data() {
        for data_type in ["integer", "string", "list"] {
            let (status, _) = check(
                Shape::Inputs,
                Check::DataTypeCount {
                    data_type: data_type.into(),
                    expected: 0,
                },
                r#"{"result": "success", "data": {}}"#,
            );
            assert_eq!(status, TestResult::Pass);
        }

        let (status, _) = check(
            Shape::Inputs,
            Check::NamesKnown(BTreeMap::new()),
            r#"{"data": {"empty": []}}"#,
        );
        assert_eq!(status, TestResult::Pass);
    }

    #[test]
    fn data_types_are_counted_across_groups() {
        let body = r#"{"data": {
            "a": [{"datatypename": "integer", "name": "port"}, {"datatypename": "string", "name": "host"}],
            "b": [{"datatypename": "integer", "name": "replicas"}]
        }}"#;

        let (status, actual) = check(
            Shape::Inputs,
            Check::DataTypeCount {
                data_type: "integer".into(),
                expected: 2,
            },
            body,
        );
        assert_eq!(status, TestResult::Pass);
        assert_eq!(actual, Actual::Value("2 inputs of type integer".into()));

        let names = BTreeMap::from([("port".to_string(), true), ("host".to_string(), true)]);
        let (status, actual) = check(Shape::Inputs, Check::NamesKnown(names), body);
        assert_eq!(status, TestResult::Fail);
        assert_eq!(actual, Actual::Value("unexpected names [replicas]".into()));
    }

    #[test]
    fn service_urls_consist_of_expected() {
        let expected = Check::ServiceUrls(vec!["zip:a".into(), "zip:b".into()]);

        let (status, _) = check(
            Shape::Models,
            expected.clone(),
            r#"{"data": {"listOfModels": [{"service_url": "zip:b"}, {"service_url": "zip:a"}]}}"#,
        );
        assert_eq!(status, TestResult::Pass);

        let (status, _) = check(
            Shape::Models,
            expected.clone(),
            r#"{"data": {"listOfModels": [{"service_url": "zip:a"}, {"name": "no url"}]}}"#,
        );
        assert_eq!(status, TestResult::Fail);

        let (status, _) = check(
            Shape::Models,
            expected,
            r#"{"data": {"listOfModels": [{"service_url": "zip:a"}]}}"#,
        );
        assert_eq!(status, TestResult::Fail);
    }

    #[test]
    fn metadata_count_needs_a_model() {
        let (status, _) = check(
            Shape::Metadata,
            Check::MetadataCount(3),
            r#"{"data": {"models": [{"metadata": {"a": "1", "b": "2", "c": "3"}}]}}"#,
        );
        assert_eq!(status, TestResult::Pass);

        let (status, actual) = check(
            Shape::Metadata,
            Check::MetadataCount(3),
            r#"{"data": {"models": []}}"#,
        );
        assert_eq!(status, TestResult::Fail);
        assert_eq!(actual, Actual::Value("no models".into()));
    }

    #[test]
    fn message_and_result_compare_exactly() {
        let body = r#"{"result": "success", "message": "Clout saved"}"#;

        let (status, _) = check(Shape::Status, Check::Result("success".into()), body);
        assert_eq!(status, TestResult::Pass);

        let (status, actual) = check(Shape::Status, Check::Message("clout saved".into()), body);
        assert_eq!(status, TestResult::Fail);
        assert_eq!(actual, Actual::Value("\"Clout saved\"".into()));
    }

    #[test]
    fn check_on_the_wrong_shape_fails() {
        let (status, actual) = check(Shape::InstanceList, Check::Message("ok".into()), "[]");

        assert_eq!(status, TestResult::Fail);
        assert_eq!(actual, Actual::ShapeMismatch(Shape::InstanceList));
    }

    #[test]
    fn empty_body_is_a_decode_failure() {
        let assert_result = result(
            Some((Shape::InstanceList, Check::RecordCount(0))),
            Outcome::Response(CapturedResponse::empty()),
        )
        .assert();

        assert_eq!(assert_result.status, TestResult::Fail);
        assert!(matches!(
            assert_result.actual,
            Actual::DecodeFailed { status: None, ref body, .. } if body.is_empty()
        ));
    }

    #[test]
    fn request_failures_and_skips() {
        let failed = result(None, Outcome::Failed("connection refused".into())).assert();
        assert_eq!(failed.status, TestResult::Fail);
        assert_eq!(
            failed.actual,
            Actual::RequestFailed("connection refused".into())
        );

        let skipped = result(
            Some((Shape::InstanceList, Check::RecordCount(2))),
            Outcome::Skipped("suite setup failed".into()),
        )
        .assert();
        assert_eq!(skipped.status, TestResult::Skip);

        let setup = result(None, response("")).assert();
        assert_eq!(setup.status, TestResult::Pass);
    }

    #[tokio::test]
    async fn test_full() {
        let (runner_tx, asserter_rx) = flume::unbounded::<RunnerResult>();
        let (asserter_tx, outputter_rx) = flume::unbounded();

        tokio::spawn(async move {
            Asserter::run(asserter_rx, asserter_tx).await.unwrap();
        });

        runner_tx
            .send_async(result(
                Some((Shape::InstanceList, Check::RecordCount(2))),
                response(r#"[{"uid":"a"},{"uid":"b"}]"#),
            ))
            .await
            .unwrap();

        let report = outputter_rx.recv_async().await.unwrap();
        assert_eq!(report.suite, "Service Orchestrator APIs");
        assert_eq!(report.method, "GET");
        assert_eq!(report.url, "http://host/instances");
        assert_eq!(report.phase, Phase::Test);
        assert_eq!(report.result.status, TestResult::Pass);
    }
}
