// src/exec/process.rs

//! Shell command runner used by the command components.

use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::redact::obscure_text;
use crate::errors::ExecutionError;

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

fn capture<R>(stream: Option<R>, label: &'static str) -> Option<JoinHandle<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream.map(|stream| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            let mut captured = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(stream = label, "{}", line);
                captured.push_str(&line);
                captured.push('\n');
            }
            captured
        })
    })
}

async fn collect(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(h) => h.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// Run `command` through the platform shell.
///
/// If `cancel` fires first the child is killed and
/// [`ExecutionError::Cancelled`] is returned.
pub async fn run_shell_command(
    command: &str,
    working_dir: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, ExecutionError> {
    info!(cmd = %obscure_text(command), "starting process");

    let mut cmd = shell_command(command);
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for command '{}'", obscure_text(command)))?;

    let stdout = capture(child.stdout.take(), "stdout");
    let stderr = capture(child.stderr.take(), "stderr");

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of command '{}'", obscure_text(command)))?;
            let exit_code = status.code().unwrap_or(-1);

            info!(cmd = %obscure_text(command), exit_code, success = status.success(), "process exited");

            Ok(ProcessOutput {
                exit_code,
                stdout: collect(stdout).await,
                stderr: collect(stderr).await,
            })
        }

        _ = cancel.cancelled() => {
            info!(cmd = %obscure_text(command), "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(cmd = %obscure_text(command), error = %e, "failed to kill child process on cancellation");
            }
            Err(ExecutionError::Cancelled)
        }
    }
}
