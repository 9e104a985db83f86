use std::path::PathBuf;

use clap::Parser;

use crate::client::TransportErrors;
use crate::fixture::SuiteKind;

/// Runs fixture driven API suites against a compiler and service orchestrator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML run file listing the suites to run
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Suite to run, instead of the ones in the run file
    #[arg(short, long, value_enum, required_unless_present = "config")]
    pub suite: Option<SuiteKind>,

    /// JSON fixture for the suite
    #[arg(short, long, requires = "suite")]
    pub fixture: Option<PathBuf>,

    /// JSON merged over the fixture before it is used
    #[arg(long, requires = "suite")]
    pub overlay: Option<PathBuf>,

    /// Prefix for fixture URLs that start with a /
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// What to do when a call never gets a response
    #[arg(long, value_enum)]
    pub transport_errors: Option<TransportErrors>,
}
