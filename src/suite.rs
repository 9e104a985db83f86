use std::collections::BTreeMap;

use reqwest::Method;

use crate::client::ApiRequest;
use crate::decode::Shape;
use crate::fixture::Fixture;
use crate::fixture::InputsFixture;
use crate::fixture::InstancesFixture;
use crate::fixture::MetadataFixture;
use crate::fixture::ModelsFixture;

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Number of records in a list response.
    RecordCount(usize),
    VertexCount(usize),
    InstanceName(String),
    DependentInstances(Vec<String>),
    Result(String),
    Message(String),
    Data(Vec<String>),
    /// Inputs with the given `datatypename`, across every group.
    DataTypeCount {
        data_type: String,
        expected: usize,
    },
    /// Every returned input name must be a key of the map.
    NamesKnown(BTreeMap<String, bool>),
    /// The `service_url`s of the listed models, in any order.
    ServiceUrls(Vec<String>),
    /// Entries in the metadata of the first model.
    MetadataCount(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    pub name: String,
    pub check: Check,
}

/// A read scenario. The request is issued again before every test.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub name: String,
    pub request: ApiRequest,
    pub shape: Shape,
    pub tests: Vec<Test>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub name: String,
    pub setup: Option<ApiRequest>,
    pub cases: Vec<Case>,
    pub teardown: Option<ApiRequest>,
}

impl Suite {
    /// Reported results: setup, every test, teardown.
    pub fn n_tests(&self) -> usize {
        usize::from(self.setup.is_some())
            + self.cases.iter().map(|c| c.tests.len()).sum::<usize>()
            + usize::from(self.teardown.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub suites: Vec<Suite>,
}

impl Plan {
    pub fn n_tests(&self) -> usize {
        self.suites.iter().map(Suite::n_tests).sum()
    }
}

pub fn build(fixture: &Fixture) -> Suite {
    match fixture {
        Fixture::Instances(f) => instances(f),
        Fixture::Inputs(f) => inputs(f),
        Fixture::Models(f) => models(f),
        Fixture::Metadata(f) => metadata(f),
    }
}

fn request(method: Method, url: &str, body: &str) -> ApiRequest {
    let request = ApiRequest::new(method, url);
    if body.is_empty() {
        request
    } else {
        request.with_body(body)
    }
}

fn test(name: &str, check: Check) -> Test {
    Test {
        name: name.into(),
        check,
    }
}

fn status_tests(expected_message: &str, expected_result: &str) -> Vec<Test> {
    vec![
        test(
            "should have the expected message",
            Check::Message(expected_message.into()),
        ),
        test(
            "should have the expected result",
            Check::Result(expected_result.into()),
        ),
    ]
}

fn instances(f: &InstancesFixture) -> Suite {
    let demo = &f.demo_instance;
    let deployed = &f.deployed_instances;

    Suite {
        name: "Service Orchestrator APIs".into(),
        setup: Some(request(
            Method::POST,
            &f.create_instance.url,
            &f.create_instance.body,
        )),
        cases: vec![
            Case {
                name: "GET instances".into(),
                request: request(Method::GET, &f.get_instances.url, ""),
                shape: Shape::InstanceList,
                tests: vec![test(
                    "should return the expected number of instances",
                    Check::RecordCount(f.get_instances.expected_uid_count),
                )],
            },
            Case {
                name: "GET instance by name".into(),
                request: request(Method::GET, &demo.url, ""),
                shape: Shape::Instance,
                tests: vec![
                    test(
                        "should have the expected number of vertexes",
                        Check::VertexCount(demo.expected_vertexes),
                    ),
                    test(
                        "should have the correct name",
                        Check::InstanceName(demo.expected_name.clone()),
                    ),
                    test(
                        "should have the expected dependent_instance",
                        Check::DependentInstances(demo.expected_dependent_instance.clone()),
                    ),
                ],
            },
            Case {
                name: "GET deployed instances".into(),
                request: request(Method::GET, &deployed.url, ""),
                shape: Shape::StringList,
                tests: [test(
                    "should return the correct data",
                    Check::Data(deployed.expected_data.clone()),
                )]
                .into_iter()
                .chain(status_tests(
                    &deployed.expected_message,
                    &deployed.expected_result,
                ))
                .collect(),
            },
            Case {
                name: "PUT save clout file".into(),
                request: request(Method::PUT, &f.save_clout_file.url, ""),
                shape: Shape::Status,
                tests: status_tests(
                    &f.save_clout_file.expected_message,
                    &f.save_clout_file.expected_result,
                ),
            },
            Case {
                name: "GET read clout".into(),
                request: request(Method::GET, &f.read_clout.url, ""),
                shape: Shape::StringList,
                tests: status_tests(
                    &f.read_clout.expected_message,
                    &f.read_clout.expected_result,
                ),
            },
            Case {
                name: "POST parse model".into(),
                request: request(Method::POST, &f.parse_model.url, ""),
                shape: Shape::Status,
                tests: status_tests(
                    &f.parse_model.expected_message,
                    &f.parse_model.expected_result,
                ),
            },
        ],
        teardown: Some(request(Method::DELETE, &f.delete_instance.url, "")),
    }
}

fn inputs(f: &InputsFixture) -> Suite {
    let inputs = &f.get_inputs;
    let count = |data_type: &str, expected: usize| {
        test(
            &format!("should have expected count of dataTypeName {data_type}"),
            Check::DataTypeCount {
                data_type: data_type.into(),
                expected,
            },
        )
    };

    Suite {
        name: "Compiler APIs".into(),
        setup: Some(request(Method::POST, &f.save_model.url, &f.save_model.body)),
        cases: vec![Case {
            name: "GET inputs".into(),
            request: request(Method::GET, &inputs.url, &inputs.body),
            shape: Shape::Inputs,
            tests: vec![
                count("integer", inputs.integer_counts),
                count("string", inputs.string_counts),
                count("list", inputs.list_counts),
                test(
                    "should match expected name for each data object",
                    Check::NamesKnown(inputs.expected_names.clone()),
                ),
            ],
        }],
        teardown: Some(request(
            Method::DELETE,
            &f.delete_model.url,
            &f.delete_model.body,
        )),
    }
}

fn models(f: &ModelsFixture) -> Suite {
    Suite {
        name: "Compiler models".into(),
        setup: Some(request(Method::POST, &f.save_model.url, &f.save_model.body)),
        cases: vec![Case {
            name: "GET models after saving".into(),
            request: request(Method::GET, &f.list_models.url, ""),
            shape: Shape::Models,
            tests: vec![test(
                "should list the saved model",
                Check::ServiceUrls(f.list_models.expected_service_urls.clone()),
            )],
        }],
        teardown: Some(request(
            Method::DELETE,
            &f.delete_model.url,
            &f.delete_model.body,
        )),
    }
}

fn metadata(f: &MetadataFixture) -> Suite {
    Suite {
        name: "Compiler model metadata".into(),
        setup: Some(request(Method::POST, &f.save_model.url, &f.save_model.body)),
        cases: vec![Case {
            name: "GET models metadata after saving".into(),
            request: request(Method::GET, &f.metadata.url, ""),
            shape: Shape::Metadata,
            tests: vec![test(
                "should have the expected metadata count",
                Check::MetadataCount(f.metadata.expected_metadata_count),
            )],
        }],
        teardown: Some(request(
            Method::DELETE,
            &f.delete_model.url,
            &f.delete_model.body,
        )),
    }
}
