// src/component/builtin/monitor.rs

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::component::{ComponentFuture, ComponentHandler, ExecutionContext};
use crate::config::redact::obscure_text;
use crate::errors::{ComponentError, ExecutionError};
use crate::exec::run_shell_command;
use crate::types::ErrorReason;

const DEFAULT_FREQUENCY: Duration = Duration::from_secs(60);

/// Runs `Command` every `MonitorFrequency` (default 1m) after an optional
/// `MonitorWarmupPeriod`, until cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteCommandMonitor;

impl ComponentHandler for ExecuteCommandMonitor {
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> ComponentFuture<'a> {
        Box::pin(async move {
            let command = ctx.require_str("Command")?;
            let working_dir = ctx.parameter_str("WorkingDirectory").map(Path::new);
            let frequency = ctx
                .parameter_duration("MonitorFrequency")?
                .unwrap_or(DEFAULT_FREQUENCY);
            let warmup = ctx
                .parameter_duration("MonitorWarmupPeriod")?
                .unwrap_or(Duration::ZERO);

            if !warmup.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(warmup) => {}
                    _ = ctx.cancel.cancelled() => return Ok(()),
                }
            }

            let mut samples = 0u64;
            loop {
                let output = match run_shell_command(command, working_dir, &ctx.cancel).await {
                    Ok(output) => output,
                    Err(ExecutionError::Cancelled) => return Ok(()),
                    Err(e) => {
                        return Err(ComponentError::monitor(
                            ErrorReason::MonitorFailed,
                            format!("Monitor command '{}' could not be started.", obscure_text(command)),
                        )
                        .with_source(e)
                        .into());
                    }
                };

                if !output.success() {
                    return Err(ComponentError::monitor(
                        ErrorReason::MonitorFailed,
                        format!(
                            "Monitor command '{}' failed with exit code {}.",
                            obscure_text(command),
                            output.exit_code
                        ),
                    )
                    .into());
                }

                samples += 1;
                debug!(cmd = %obscure_text(command), samples, "monitor sample captured");

                tokio::select! {
                    _ = tokio::time::sleep(frequency) => {}
                    _ = ctx.cancel.cancelled() => return Ok(()),
                }
            }
        })
    }
}
