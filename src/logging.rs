// src/logging.rs

//! Logging setup for `profilerun` using `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen from, in order:
//! 1. `--log-level` CLI flag
//! 2. `PROFILERUN_LOG`, any `EnvFilter` directive (`debug`,
//!    `profilerun::engine=trace,info`, ...)
//! 3. `log_level` from the agent settings file
//! 4. `info`
//!
//! Output goes to STDERR; STDOUT belongs to workload commands and dry-run
//! listings.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "PROFILERUN_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, settings_level: Option<&str>) -> Result<()> {
    let env_directive = std::env::var(LOG_ENV_VAR).ok();
    let filter = select_filter(cli_level, env_directive.as_deref(), settings_level)?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

/// Filter for the given sources, highest priority first.
pub fn select_filter(
    cli_level: Option<LogLevel>,
    env_directive: Option<&str>,
    settings_level: Option<&str>,
) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(directive_for(level)));
    }

    let (source, directive) = match (env_directive, settings_level) {
        (Some(env), _) if !env.trim().is_empty() => (LOG_ENV_VAR, env),
        (_, Some(settings)) if !settings.trim().is_empty() => ("settings log_level", settings),
        _ => return Ok(EnvFilter::new(DEFAULT_DIRECTIVE)),
    };

    EnvFilter::try_new(directive.trim())
        .with_context(|| format!("invalid log filter '{directive}' from {source}"))
}

fn directive_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
