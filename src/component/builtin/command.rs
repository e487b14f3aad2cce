// src/component/builtin/command.rs

use std::path::Path;

use tracing::{info, warn};

use crate::component::{ComponentFuture, ComponentHandler, ExecutionContext};
use crate::config::redact::obscure_text;
use crate::errors::ComponentError;
use crate::exec::run_shell_command;
use crate::types::{ComponentKind, ErrorReason};

/// Runs `Command` once through the platform shell.
///
/// Parameters: `Command` (required), `WorkingDirectory`, `RequestReboot`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteCommand;

impl ComponentHandler for ExecuteCommand {
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> ComponentFuture<'a> {
        Box::pin(async move {
            let command = ctx.require_str("Command")?;
            let working_dir = ctx.parameter_str("WorkingDirectory").map(Path::new);

            let output = run_shell_command(command, working_dir, &ctx.cancel).await?;
            if !output.success() {
                let reason = match ctx.kind {
                    ComponentKind::Dependency => ErrorReason::DependencyInstallationFailed,
                    ComponentKind::Action => ErrorReason::WorkloadFailed,
                    ComponentKind::Monitor => ErrorReason::MonitorFailed,
                };
                let stderr = output.stderr.trim();
                warn!(cmd = %obscure_text(command), exit_code = output.exit_code, "command failed");
                return Err(ComponentError::new(
                    ctx.failure_kind(),
                    reason,
                    format!(
                        "Command '{}' failed with exit code {}.{}",
                        obscure_text(command),
                        output.exit_code,
                        if stderr.is_empty() {
                            String::new()
                        } else {
                            format!(" stderr: {stderr}")
                        }
                    ),
                )
                .into());
            }

            if ctx.parameter_bool("RequestReboot") {
                info!(cmd = %obscure_text(command), "command requested a system reboot");
                ctx.services.reboot.request();
            }

            Ok(())
        })
    }
}
