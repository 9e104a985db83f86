use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "http://localhost:10010";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    /// Service orchestrator instances, clout files and model parsing
    Instances,
    /// Compiler inputs of a saved model
    Inputs,
    /// Listing of saved models
    Models,
    /// Metadata of saved models
    Metadata,
}

impl SuiteKind {
    /// Suites that reproduce a fixed scenario and run without a fixture file.
    pub fn has_builtin_fixture(self) -> bool {
        matches!(self, SuiteKind::Models | SuiteKind::Metadata)
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteKind::Instances => write!(f, "instances"),
            SuiteKind::Inputs => write!(f, "inputs"),
            SuiteKind::Models => write!(f, "models"),
            SuiteKind::Metadata => write!(f, "metadata"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fixture {
    Instances(InstancesFixture),
    Inputs(InputsFixture),
    Models(ModelsFixture),
    Metadata(MetadataFixture),
}

// --- instances ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstancesFixture {
    #[serde(rename = "createInstanceAPI")]
    pub create_instance: CreateInstanceApi,
    #[serde(rename = "getInstancesAPI")]
    pub get_instances: GetInstancesApi,
    #[serde(rename = "demoInstanceAPI")]
    pub demo_instance: DemoInstanceApi,
    #[serde(rename = "deleteInstanceAPI")]
    pub delete_instance: DeleteInstanceApi,
    #[serde(rename = "deployedInstancesAPI")]
    pub deployed_instances: DeployedInstancesApi,
    #[serde(rename = "SaveCloutFileAPI", alias = "saveCloutFileAPI")]
    pub save_clout_file: SaveCloutFileApi,
    #[serde(rename = "ReadCloutAPI", alias = "readCloutAPI")]
    pub read_clout: ReadCloutApi,
    #[serde(rename = "ParseModelAPI", alias = "parseModelAPI")]
    pub parse_model: ParseModelApi,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateInstanceApi {
    #[serde(rename = "createInstanceURL")]
    pub url: String,
    #[serde(rename = "createInstanceBody")]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetInstancesApi {
    #[serde(rename = "getInstancesURL")]
    pub url: String,
    #[serde(rename = "expectedResult")]
    pub expected_result: String,
    #[serde(rename = "expectedUidCount")]
    pub expected_uid_count: usize,
    #[serde(rename = "expectedVersionCount")]
    pub expected_version_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoInstanceApi {
    #[serde(rename = "apiURL")]
    pub url: String,
    #[serde(rename = "expectedAttributes")]
    pub expected_attributes: usize,
    #[serde(rename = "expectedVertexes")]
    pub expected_vertexes: usize,
    #[serde(rename = "expectedName")]
    pub expected_name: String,
    #[serde(rename = "expectedDependentInstance")]
    pub expected_dependent_instance: Vec<String>,
}

impl Default for DemoInstanceApi {
    fn default() -> Self {
        Self {
            url: String::new(),
            expected_attributes: 0,
            expected_vertexes: 0,
            expected_name: "demo1".into(),
            // An instance without dependents reports a single empty string.
            expected_dependent_instance: vec![String::new()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteInstanceApi {
    #[serde(rename = "deleteModelURL")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployedInstancesApi {
    #[serde(rename = "apiURL")]
    pub url: String,
    #[serde(rename = "expectedData")]
    pub expected_data: Vec<String>,
    #[serde(rename = "expectedMessage")]
    pub expected_message: String,
    #[serde(rename = "expectedResult")]
    pub expected_result: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveCloutFileApi {
    #[serde(rename = "savecloutURL")]
    pub url: String,
    #[serde(rename = "expectedMessage")]
    pub expected_message: String,
    #[serde(rename = "expectedResult")]
    pub expected_result: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadCloutApi {
    #[serde(rename = "readcloutURL")]
    pub url: String,
    #[serde(rename = "expectedData")]
    pub expected_data: Vec<String>,
    #[serde(rename = "expectedMessage")]
    pub expected_message: String,
    #[serde(rename = "expectedResult")]
    pub expected_result: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseModelApi {
    #[serde(rename = "parseModelURL")]
    pub url: String,
    #[serde(rename = "expectedMessage")]
    pub expected_message: String,
    #[serde(rename = "expectedResult")]
    pub expected_result: String,
}

// --- inputs, models and metadata share the save/delete roles ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveModelApi {
    #[serde(rename = "saveModelURL")]
    pub url: String,
    #[serde(rename = "saveModelBody")]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteModelApi {
    #[serde(rename = "deleteModelURL")]
    pub url: String,
    #[serde(rename = "deleteModelBody")]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsFixture {
    #[serde(rename = "saveModelAPI")]
    pub save_model: SaveModelApi,
    #[serde(rename = "deleteModelAPI")]
    pub delete_model: DeleteModelApi,
    #[serde(rename = "getInputAPI")]
    pub get_inputs: GetInputsApi,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetInputsApi {
    #[serde(rename = "getInputsURL")]
    pub url: String,
    #[serde(rename = "getInputsBody")]
    pub body: String,
    #[serde(rename = "integerCounts")]
    pub integer_counts: usize,
    #[serde(rename = "stringCounts")]
    pub string_counts: usize,
    #[serde(rename = "listCounts")]
    pub list_counts: usize,
    #[serde(rename = "expectedNames")]
    pub expected_names: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsFixture {
    #[serde(rename = "saveModelAPI")]
    pub save_model: SaveModelApi,
    #[serde(rename = "listModelsAPI")]
    pub list_models: ListModelsApi,
    #[serde(rename = "deleteModelAPI")]
    pub delete_model: DeleteModelApi,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListModelsApi {
    #[serde(rename = "listModelsURL")]
    pub url: String,
    #[serde(rename = "expectedServiceUrls")]
    pub expected_service_urls: Vec<String>,
}

impl Default for ModelsFixture {
    fn default() -> Self {
        Self {
            save_model: SaveModelApi {
                url: format!("{DEFAULT_BASE_URL}/compiler/v1/model/db/save"),
                body: save_body(
                    "/tosca-models/csars/cluster-resource.csar",
                    "cluster_input_service.json",
                ),
            },
            list_models: ListModelsApi {
                url: format!("{DEFAULT_BASE_URL}/compiler/v1/db/models"),
                expected_service_urls: vec![
                    "zip:file:c:/tosca-models/csars/cluster-resource.csar!/cluster_input_service.yaml"
                        .into(),
                ],
            },
            delete_model: DeleteModelApi {
                url: format!("{DEFAULT_BASE_URL}/compiler/v1/model/db/cluster_input_service"),
                body: delete_body(
                    "zip:file:c:/tosca-models/csars/cluster-resource.csar!/cluster_input_service.yaml",
                ),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataFixture {
    #[serde(rename = "saveModelAPI")]
    pub save_model: SaveModelApi,
    #[serde(rename = "metadataAPI")]
    pub metadata: MetadataApi,
    #[serde(rename = "deleteModelAPI")]
    pub delete_model: DeleteModelApi,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataApi {
    #[serde(rename = "metadataURL")]
    pub url: String,
    #[serde(rename = "expectedMetadataCount")]
    pub expected_metadata_count: usize,
}

impl Default for MetadataFixture {
    fn default() -> Self {
        Self {
            save_model: SaveModelApi {
                url: format!("{DEFAULT_BASE_URL}/compiler/v1/model/db/save"),
                body: save_body("/tosca-models/csars/dcaf-cmts-argo-events.csar", "dcaf.json"),
            },
            metadata: MetadataApi {
                url: format!("{DEFAULT_BASE_URL}/compiler/v1/db/models/metadata"),
                expected_metadata_count: 3,
            },
            delete_model: DeleteModelApi {
                url: format!("{DEFAULT_BASE_URL}/compiler/v1/model/db/dcaf_service"),
                body: delete_body(
                    "zip:file:d:/tosca-models/csars/dcaf-cmts-argo-events.csar!/dcaf_service.yaml",
                ),
            },
        }
    }
}

fn save_body(csar: &str, output: &str) -> String {
    serde_json::json!({
        "url": csar,
        "resolve": true,
        "coerce": false,
        "quirks": ["data_types.string.permissive"],
        "output": output,
        "inputs": "",
        "inputsUrl": "",
        "force": true,
    })
    .to_string()
}

fn delete_body(namespace: &str) -> String {
    serde_json::json!({
        "namespace": namespace,
        "version": "tick_profile_1_0",
        "includeTypes": true,
    })
    .to_string()
}
