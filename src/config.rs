use std::path::Path;
use std::path::PathBuf;

use miette::Diagnostic;
use miette::NamedSource;
use miette::SourceSpan;
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;
use crate::client::TransportErrors;
use crate::fixture::SuiteKind;

const BASE_URL_ENDS_WITH: &str =
    "The base URL can't end with a /, and each fixture URL using it must start with one";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read run file `{path}`")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse run file `{path}`: {message}")]
    Toml {
        path: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("Invalid base URL `{0}`: {msg}", msg = BASE_URL_ENDS_WITH)]
    BaseUrl(String),

    #[error("No suites to run")]
    #[diagnostic(help("pass --suite or add a [[suite]] table to the run file"))]
    NoSuites,
}

/// The TOML run file.
///
/// ```toml
/// base_url = "http://localhost:10010"
/// transport_errors = "log"
///
/// [[suite]]
/// kind = "inputs"
/// fixture = "fixtures/dcaf_resource.json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RunConfig {
    pub base_url: Option<String>,
    pub transport_errors: Option<TransportErrors>,
    #[serde(default, rename = "suite")]
    pub suites: Vec<SuiteEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuiteEntry {
    pub kind: SuiteKind,
    pub fixture: Option<PathBuf>,
    pub overlay: Option<PathBuf>,
}

/// Everything a run needs once the command line and run file are combined.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: Option<String>,
    pub transport_errors: TransportErrors,
    pub suites: Vec<SuiteEntry>,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut config: RunConfig = toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.display().to_string(),
            message: e.message().to_string(),
            span: e.span().map(SourceSpan::from),
            src: NamedSource::new(path.display().to_string(), contents.clone()),
        })?;

        // Fixture paths in the run file are relative to the file itself.
        if let Some(dir) = path.parent() {
            for suite in &mut config.suites {
                suite.fixture = suite.fixture.take().map(|p| dir.join(p));
                suite.overlay = suite.overlay.take().map(|p| dir.join(p));
            }
        }

        Ok(config)
    }
}

/// Flags on the command line win over the run file. A `--suite` replaces the
/// suites listed in the file.
pub fn resolve(cli: &Cli, config: RunConfig) -> Result<Settings, ConfigError> {
    let suites = match cli.suite {
        Some(kind) => vec![SuiteEntry {
            kind,
            fixture: cli.fixture.clone(),
            overlay: cli.overlay.clone(),
        }],
        None => config.suites,
    };

    if suites.is_empty() {
        return Err(ConfigError::NoSuites);
    }

    let base_url = cli.base_url.clone().or(config.base_url);
    if let Some(base_url) = &base_url
        && base_url.ends_with('/')
    {
        return Err(ConfigError::BaseUrl(base_url.clone()));
    }

    Ok(Settings {
        base_url,
        transport_errors: cli
            .transport_errors
            .or(config.transport_errors)
            .unwrap_or_default(),
        suites,
    })
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::path::PathBuf;

    use clap::Parser;
    use tempfile::NamedTempFile;

    use crate::cli::Cli;
    use crate::client::TransportErrors;
    use crate::config::ConfigError;
    use crate::config::RunConfig;
    use crate::config::SuiteEntry;
    use crate::config::resolve;
    use crate::fixture::SuiteKind;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("compiler_quest").chain(args.iter().copied())).unwrap()
    }

    fn run_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_suites_from_the_run_file() {
        let file = run_file(
            r#"
            base_url = "http://localhost:10010"
            transport_errors = "log"

            [[suite]]
            kind = "inputs"
            fixture = "fixtures/dcaf_resource.json"

            [[suite]]
            kind = "models"
            "#,
        );

        let config = RunConfig::from_file(file.path()).unwrap();
        let dir = file.path().parent().unwrap();

        assert_eq!(config.base_url.as_deref(), Some("http://localhost:10010"));
        assert_eq!(config.transport_errors, Some(TransportErrors::Log));
        assert_eq!(
            config.suites,
            vec![
                SuiteEntry {
                    kind: SuiteKind::Inputs,
                    fixture: Some(dir.join("fixtures/dcaf_resource.json")),
                    overlay: None,
                },
                SuiteEntry {
                    kind: SuiteKind::Models,
                    fixture: None,
                    overlay: None,
                },
            ]
        );
    }

    #[test]
    fn unknown_suite_kind_is_a_toml_error() {
        let file = run_file("[[suite]]\nkind = \"widgets\"\n");

        let result = RunConfig::from_file(file.path());

        assert!(matches!(result, Err(ConfigError::Toml { span: Some(_), .. })));
    }

    #[test]
    fn command_line_overrides_the_run_file() {
        let config = RunConfig {
            base_url: Some("http://localhost:10000".into()),
            transport_errors: Some(TransportErrors::Log),
            suites: vec![SuiteEntry {
                kind: SuiteKind::Models,
                fixture: None,
                overlay: None,
            }],
        };

        let settings = resolve(
            &cli(&[
                "--suite",
                "instances",
                "--fixture",
                "so.json",
                "--base-url",
                "http://localhost:10010",
                "--transport-errors",
                "propagate",
            ]),
            config,
        )
        .unwrap();

        assert_eq!(settings.base_url.as_deref(), Some("http://localhost:10010"));
        assert_eq!(settings.transport_errors, TransportErrors::Propagate);
        assert_eq!(settings.suites.len(), 1);
        assert_eq!(settings.suites[0].kind, SuiteKind::Instances);
        assert_eq!(settings.suites[0].fixture, Some(PathBuf::from("so.json")));
    }

    #[test]
    fn transport_errors_default_to_propagate() {
        let settings = resolve(&cli(&["--suite", "metadata"]), RunConfig::default()).unwrap();

        assert_eq!(settings.transport_errors, TransportErrors::Propagate);
        assert_eq!(settings.base_url, None);
    }

    #[test]
    fn base_url_must_not_end_with_a_slash() {
        let result = resolve(
            &cli(&["--suite", "models", "--base-url", "http://localhost:10010/"]),
            RunConfig::default(),
        );

        let Err(err) = result else {
            panic!("expected a base url error");
        };
        assert!(matches!(err, ConfigError::BaseUrl(_)));
        assert_eq!(
            err.to_string(),
            "Invalid base URL `http://localhost:10010/`: The base URL can't end with a /, \
             and each fixture URL using it must start with one"
        );
    }

    #[test]
    fn empty_run_file_has_nothing_to_run() {
        let result = resolve(&cli(&["--config", "quest.toml"]), RunConfig::default());

        assert!(matches!(result, Err(ConfigError::NoSuites)));
    }
}
