// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::duration::parse_duration;
use crate::config::model::Parameters;
use crate::engine::ProfileTiming;
use crate::errors::{AgentError, Result};
use crate::types::DeterminismScope;

/// Separator between `key=value` pairs in `--metadata` and `--parameters`.
pub const PAIR_DELIMITER: &str = ",,,";

/// Command-line arguments for `profilerun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "profilerun",
    version,
    about = "Run a workload profile: dependencies, an actions loop and background monitors.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the execution profile (JSON or YAML).
    #[arg(long, value_name = "PATH")]
    pub profile: PathBuf,

    /// Run time limit in minutes or as a duration (`90`, `01:30:00`, `45m`).
    ///
    /// Append `/deterministic` to let the running action finish, or
    /// `/deterministic*` to let the whole round of actions finish.
    #[arg(long, value_name = "TIMEOUT", conflicts_with = "iterations")]
    pub timeout: Option<String>,

    /// Number of rounds of actions to run (`-1` for no limit).
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub iterations: Option<i64>,

    /// Scenarios to include, or exclude with a `-` prefix (`a,b,-c`).
    #[arg(long, value_name = "LIST", value_delimiter = ',', allow_hyphen_values = true)]
    pub scenarios: Vec<String>,

    /// Treat every action failure as terminal.
    #[arg(long)]
    pub fail_fast: bool,

    /// Grace period for in-flight work on exit (`30s`, `00:02:00`).
    #[arg(long, value_name = "DURATION")]
    pub exit_wait: Option<String>,

    /// Randomization seed handed to every component.
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub seed: Option<i64>,

    /// Global metadata as `key=value` pairs separated by `,,,`.
    #[arg(long, value_name = "PAIRS")]
    pub metadata: Option<String>,

    /// Profile parameter overrides as `key=value` pairs separated by `,,,`.
    #[arg(long, value_name = "PAIRS")]
    pub parameters: Option<String>,

    /// Directory packages are installed into.
    #[arg(long, value_name = "DIR")]
    pub packages: Option<PathBuf>,

    /// Directory backing the package blob store.
    #[arg(long, value_name = "DIR")]
    pub blob_store: Option<PathBuf>,

    #[arg(long)]
    pub no_dependencies: bool,

    #[arg(long)]
    pub no_actions: bool,

    #[arg(long)]
    pub no_monitors: bool,

    /// Agent settings file (TOML). Missing is fine.
    #[arg(long, value_name = "PATH", default_value = "profilerun.toml")]
    pub settings: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROFILERUN_LOG`, the settings file or a default level
    /// will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, list the components, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

impl CliArgs {
    /// Timing policy selected by `--timeout` / `--iterations`.
    pub fn timing(&self) -> Result<ProfileTiming> {
        match (&self.timeout, self.iterations) {
            (Some(timeout), _) => parse_timeout(timeout),
            (None, Some(iterations)) => ProfileTiming::iterations(iterations),
            (None, None) => Ok(ProfileTiming::forever()),
        }
    }
}

/// Parse `<minutes|duration>[/deterministic|/deterministic*]`.
pub fn parse_timeout(value: &str) -> Result<ProfileTiming> {
    let (amount, hint) = match value.split_once('/') {
        Some((amount, hint)) => (amount.trim(), hint),
        None => (value.trim(), ""),
    };

    let determinism: DeterminismScope = hint.parse().map_err(AgentError::InvalidTiming)?;

    let duration = match amount.parse::<u64>() {
        Ok(minutes) => minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| AgentError::InvalidTiming(format!("timeout '{value}' is too large")))?,
        Err(_) => parse_duration(amount)
            .map_err(|e| AgentError::InvalidTiming(format!("timeout '{value}': {e}")))?,
    };

    Ok(match determinism {
        DeterminismScope::None => ProfileTiming::timeout(duration),
        scope => ProfileTiming::deterministic_timeout(duration, scope),
    })
}

/// Parse `"k1=v1,,,k2=v2"` into a parameter bag. Values stay strings.
pub fn parse_delimited_pairs(value: &str) -> Result<Parameters> {
    let mut pairs = Parameters::new();
    for entry in value.split(PAIR_DELIMITER) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, val) = entry.split_once('=').ok_or_else(|| {
            AgentError::ConfigError(format!("expected key=value, got '{entry}'"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AgentError::ConfigError(format!("empty key in '{entry}'")));
        }
        pairs.insert(key, val.trim());
    }
    Ok(pairs)
}
