// src/component/builtin/wait.rs

use crate::component::{ComponentFuture, ComponentHandler, ExecutionContext};

/// Waits `Duration`, or until cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitExecutor;

impl ComponentHandler for WaitExecutor {
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> ComponentFuture<'a> {
        Box::pin(async move {
            let duration = ctx.require_duration("Duration")?;

            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = ctx.cancel.cancelled() => {}
            }
            Ok(())
        })
    }
}
