use std::path::Path;

use miette::Diagnostic;
use miette::NamedSource;
use miette::SourceSpan;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::fixture::Fixture;
use crate::fixture::SuiteKind;

#[derive(Debug, Error, Diagnostic)]
pub enum FixtureError {
    #[error("Failed to read fixture file `{path}`")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fixture file `{path}`: {message}")]
    #[diagnostic(help("fixtures are plain JSON and their keys are case sensitive"))]
    Parse {
        path: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid value here")]
        span: SourceSpan,
    },

    #[error("Fixture `{path}` does not fit the {kind} suite: {source}")]
    Schema {
        path: String,
        kind: SuiteKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("The {0} suite has no built-in fixture, pass one with --fixture")]
    MissingFixture(SuiteKind),
}

/// Loads the fixture for a suite.
///
/// Without a path the built-in fixture is used, which only the models and
/// metadata suites have. The overlay, when given, is merged over the fixture
/// before it is decoded. Fields named nowhere keep their built-in value, or
/// their zero value for suites without one.
pub fn load_fixture(
    kind: SuiteKind,
    path: Option<&Path>,
    overlay: Option<&Path>,
) -> Result<Fixture, FixtureError> {
    let fixture = match kind {
        SuiteKind::Instances => Fixture::Instances(load(kind, path, overlay)?),
        SuiteKind::Inputs => Fixture::Inputs(load(kind, path, overlay)?),
        SuiteKind::Models => Fixture::Models(load(kind, path, overlay)?),
        SuiteKind::Metadata => Fixture::Metadata(load(kind, path, overlay)?),
    };

    Ok(fixture)
}

fn load<T>(kind: SuiteKind, path: Option<&Path>, overlay: Option<&Path>) -> Result<T, FixtureError>
where
    T: DeserializeOwned + Serialize + Default,
{
    // Decoding straight from the text keeps line and column for the report.
    if let (Some(path), None) = (path, overlay)
        && !kind.has_builtin_fixture()
    {
        let contents = read(path)?;
        return serde_json::from_str(&contents).map_err(|e| parse_error(path, contents, e));
    }

    // A fixture file for a built-in suite only replaces the fields it names.
    let mut document = if kind.has_builtin_fixture() {
        serde_json::to_value(T::default()).map_err(|source| FixtureError::Schema {
            path: "<built-in>".into(),
            kind,
            source,
        })?
    } else {
        Value::Null
    };

    match path {
        Some(path) => merge(&mut document, read_json(path)?),
        None if kind.has_builtin_fixture() => {}
        None => return Err(FixtureError::MissingFixture(kind)),
    }

    if let Some(overlay) = overlay {
        merge(&mut document, read_json(overlay)?);
    }

    serde_json::from_value(document).map_err(|source| FixtureError::Schema {
        path: path.map_or_else(|| "<built-in>".into(), |p| p.display().to_string()),
        kind,
        source,
    })
}

fn read(path: &Path) -> Result<String, FixtureError> {
    std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn read_json(path: &Path) -> Result<Value, FixtureError> {
    let contents = read(path)?;
    serde_json::from_str(&contents).map_err(|e| parse_error(path, contents, e))
}

fn parse_error(path: &Path, contents: String, error: serde_json::Error) -> FixtureError {
    let offset = offset_of(&contents, error.line(), error.column());
    let len = usize::from(offset < contents.len());
    let path = path.display().to_string();

    FixtureError::Parse {
        message: error.to_string(),
        src: NamedSource::new(path.clone(), contents),
        span: SourceSpan::new(offset.into(), len),
        path,
    }
}

/// serde_json reports 1-based lines and columns.
fn offset_of(src: &str, line: usize, column: usize) -> usize {
    let line_start: usize = src
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();

    (line_start + column.saturating_sub(1)).min(src.len())
}

/// Objects merge key by key, anything else in the overlay replaces the base.
/// A `null` in the overlay leaves the base untouched.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}
