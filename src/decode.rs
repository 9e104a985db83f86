use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::DeserializeOwned;

/// The response layout a scenario expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{ result, message }`, anything in `data` is ignored.
    Status,
    /// `{ result, message, data: [string] }`
    StringList,
    /// `[instance]`
    InstanceList,
    /// `instance`
    Instance,
    /// `{ result, message, data: { group: [input] } }`
    Inputs,
    /// `{ result, message, data: { listOfModels: [model] } }`
    Models,
    /// `{ result, data: { models: [{ metadata }] } }`
    Metadata,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Status(StatusEnvelope),
    StringList(StringListEnvelope),
    InstanceList(Vec<Instance>),
    Instance(Instance),
    Inputs(InputsEnvelope),
    Models(ModelsEnvelope),
    Metadata(MetadataEnvelope),
}

impl Decoded {
    pub fn shape(&self) -> Shape {
        match self {
            Decoded::Status(_) => Shape::Status,
            Decoded::StringList(_) => Shape::StringList,
            Decoded::InstanceList(_) => Shape::InstanceList,
            Decoded::Instance(_) => Shape::Instance,
            Decoded::Inputs(_) => Shape::Inputs,
            Decoded::Models(_) => Shape::Models,
            Decoded::Metadata(_) => Shape::Metadata,
        }
    }

    /// The `result` field, for shapes wrapped in an envelope.
    pub fn result(&self) -> Option<&str> {
        match self {
            Decoded::Status(e) => Some(&e.result),
            Decoded::StringList(e) => Some(&e.result),
            Decoded::Inputs(e) => Some(&e.result),
            Decoded::Models(e) => Some(&e.result),
            Decoded::Metadata(e) => Some(&e.result),
            Decoded::InstanceList(_) | Decoded::Instance(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Decoded::Status(e) => Some(&e.message),
            Decoded::StringList(e) => Some(&e.message),
            Decoded::Inputs(e) => Some(&e.message),
            Decoded::Models(e) => Some(&e.message),
            Decoded::Metadata(_) | Decoded::InstanceList(_) | Decoded::Instance(_) => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Status => "status envelope",
            Shape::StringList => "string list envelope",
            Shape::InstanceList => "instance list",
            Shape::Instance => "instance",
            Shape::Inputs => "inputs envelope",
            Shape::Models => "models envelope",
            Shape::Metadata => "metadata envelope",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default, deserialize_with = "zero")]
    pub result: String,
    #[serde(default, deserialize_with = "zero")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StringListEnvelope {
    #[serde(default, deserialize_with = "zero")]
    pub result: String,
    #[serde(default, deserialize_with = "zero")]
    pub message: String,
    #[serde(default, deserialize_with = "zero")]
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Instance {
    #[serde(default, deserialize_with = "zero")]
    pub uid: String,
    #[serde(default, deserialize_with = "zero")]
    pub name: String,
    #[serde(default, deserialize_with = "zero")]
    pub dependent_instance: Vec<String>,
    #[serde(default, deserialize_with = "zero")]
    pub version: String,
    #[serde(rename = "grammarversion", default, deserialize_with = "zero")]
    pub grammar_version: String,
    #[serde(default, deserialize_with = "zero")]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "zero")]
    pub vertexes: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InputsEnvelope {
    #[serde(default, deserialize_with = "zero")]
    pub result: String,
    #[serde(default, deserialize_with = "zero")]
    pub message: String,
    #[serde(default, deserialize_with = "zero")]
    pub data: BTreeMap<String, Vec<InputDefinition>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InputDefinition {
    #[serde(rename = "datatypename", default, deserialize_with = "zero")]
    pub data_type_name: String,
    #[serde(default)]
    pub default: serde_json::Value,
    #[serde(default, deserialize_with = "zero")]
    pub name: String,
    #[serde(default, deserialize_with = "zero")]
    pub namespace: Namespace,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Namespace {
    #[serde(default, deserialize_with = "zero")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelsEnvelope {
    #[serde(default, deserialize_with = "zero")]
    pub result: String,
    #[serde(default, deserialize_with = "zero")]
    pub message: String,
    #[serde(default, deserialize_with = "zero")]
    pub data: ModelList,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelList {
    #[serde(rename = "listOfModels", default, deserialize_with = "zero")]
    pub list_of_models: Vec<serde_json::Value>,
}

impl ModelList {
    /// `service_url` of every listed model, `None` where a model has none.
    pub fn service_urls(&self) -> Vec<Option<String>> {
        self.list_of_models
            .iter()
            .map(|model| {
                model
                    .get("service_url")
                    .and_then(|url| url.as_str())
                    .map(str::to_string)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetadataEnvelope {
    #[serde(default, deserialize_with = "zero")]
    pub result: String,
    #[serde(default, deserialize_with = "zero")]
    pub data: ModelMetadataList,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelMetadataList {
    #[serde(default, deserialize_with = "zero")]
    pub models: Vec<ModelMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelMetadata {
    #[serde(default, deserialize_with = "zero")]
    pub metadata: BTreeMap<String, String>,
}

/// `null` and absent fields both decode to the zero value.
fn zero<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn zero_or<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, serde_json::Error> {
    Ok(serde_json::from_slice::<Option<T>>(body)?.unwrap_or_default())
}

/// Decodes a raw body into the given shape. An empty body is an error.
pub fn decode(shape: Shape, body: &[u8]) -> Result<Decoded, serde_json::Error> {
    let decoded = match shape {
        Shape::Status => Decoded::Status(zero_or(body)?),
        Shape::StringList => Decoded::StringList(zero_or(body)?),
        Shape::InstanceList => Decoded::InstanceList(zero_or(body)?),
        Shape::Instance => Decoded::Instance(zero_or(body)?),
        Shape::Inputs => Decoded::Inputs(zero_or(body)?),
        Shape::Models => Decoded::Models(zero_or(body)?),
        Shape::Metadata => Decoded::Metadata(zero_or(body)?),
    };

    Ok(decoded)
}

#[cfg(test)]
mod test {
    use crate::decode::Decoded;
    use crate::decode::Shape;
    use crate::decode::decode;

    fn instance(body: &str) -> crate::decode::Instance {
        match decode(Shape::Instance, body.as_bytes()).unwrap() {
            Decoded::Instance(instance) => instance,
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn empty_list_and_single_empty_string_stay_distinct() {
        assert_eq!(
            instance(r#"{"dependent_instance": []}"#).dependent_instance,
            Vec::<String>::new()
        );
        assert_eq!(
            instance(r#"{"dependent_instance": [""]}"#).dependent_instance,
            vec![String::new()]
        );
    }

    #[test]
    fn absent_and_null_fields_take_zero_values() {
        let decoded = instance(r#"{"uid": "a", "name": null, "vertexes": null}"#);

        assert_eq!(decoded.uid, "a");
        assert_eq!(decoded.name, "");
        assert!(decoded.vertexes.is_empty());
        assert!(decoded.dependent_instance.is_empty());
        assert!(decoded.properties.is_empty());
    }

    #[test]
    fn null_body_decodes_to_empty_list() {
        assert_eq!(
            decode(Shape::InstanceList, b"null").unwrap(),
            Decoded::InstanceList(vec![])
        );
    }

    #[test]
    fn empty_body_is_a_decode_error() {
        let err = decode(Shape::Status, b"").unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn object_for_list_shape_is_a_decode_error() {
        assert!(decode(Shape::InstanceList, br#"{"uid": "a"}"#).is_err());
        assert!(decode(Shape::StringList, br#"{"data": {"a": 1}}"#).is_err());
    }

    #[test]
    fn status_shape_ignores_data() {
        let decoded = decode(
            Shape::Status,
            br#"{"result": "success", "message": "saved", "data": {"anything": [1, 2]}}"#,
        )
        .unwrap();

        let Decoded::Status(status) = decoded else {
            panic!("expected status");
        };
        assert_eq!(status.result, "success");
        assert_eq!(status.message, "saved");
    }

    #[test]
    fn inputs_are_grouped_by_key() {
        let decoded = decode(
            Shape::Inputs,
            br#"{
                "result": "success",
                "data": {
                    "cmts": [
                        {"datatypename": "integer", "name": "port", "default": 8080,
                         "namespace": {"url": "zip:file:/a.csar!/a.yaml"}},
                        {"datatypename": "string", "name": "host"}
                    ],
                    "argo": []
                }
            }"#,
        )
        .unwrap();

        let Decoded::Inputs(inputs) = decoded else {
            panic!("expected inputs");
        };
        assert_eq!(inputs.data.len(), 2);
        assert_eq!(inputs.data["cmts"][0].data_type_name, "integer");
        assert_eq!(inputs.data["cmts"][0].default, serde_json::json!(8080));
        assert_eq!(inputs.data["cmts"][0].namespace.url, "zip:file:/a.csar!/a.yaml");
        assert!(inputs.data["argo"].is_empty());
    }

    #[test]
    fn service_urls_keep_models_without_one() {
        let decoded = decode(
            Shape::Models,
            br#"{"data": {"listOfModels": [{"service_url": "zip:a"}, {"name": "b"}]}}"#,
        )
        .unwrap();

        let Decoded::Models(models) = decoded else {
            panic!("expected models");
        };
        assert_eq!(
            models.data.service_urls(),
            vec![Some("zip:a".to_string()), None]
        );
    }
}
