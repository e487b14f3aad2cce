// src/engine/classify.rs

//! Failure classification.
//!
//! The executor is the only place that decides what a component failure
//! means for the run. Actions get a transient tier (domain failures below
//! severity 500 are logged and skipped); dependencies and monitors do not.

use crate::component::Component;
use crate::errors::{ComponentError, ExecutionError};
use crate::types::ErrorReason;

const EXTENSION_MISMATCH_MESSAGE: &str = "Extension mismatch. A component was built against an \
     incompatible version of the component contract. Verify the extension version matches the \
     agent version.";

/// What to do after an action failed.
#[derive(Debug)]
pub enum ActionDisposition {
    /// Keep going with the next action. Carries the swallowed failure, if any.
    Continue(Option<ComponentError>),
    /// Abort the run.
    Abort(ComponentError),
}

fn extension_mismatch(detail: String) -> ComponentError {
    ComponentError::dependency(
        ErrorReason::ExtensionAssemblyInvalid,
        format!("{EXTENSION_MISMATCH_MESSAGE} ({detail})"),
    )
}

/// Dependency failures always abort. `None` means the dependency observed
/// cancellation.
pub fn classify_dependency_error(
    component: &Component,
    error: ExecutionError,
) -> Option<ComponentError> {
    match error {
        ExecutionError::Domain(e) => Some(e),
        ExecutionError::ExtensionMismatch(detail) => Some(extension_mismatch(detail)),
        ExecutionError::Cancelled => None,
        ExecutionError::Unexpected(source) => Some(
            ComponentError::dependency(
                ErrorReason::DependencyInstallationFailed,
                format!(
                    "Dependency installation failed for component '{}'.",
                    component.type_name()
                ),
            )
            .with_source(source),
        ),
    }
}

/// Terminal when severity >= 500 or either FailFast flag is set; otherwise
/// the action is skipped.
pub fn classify_action_error(
    component: &Component,
    error: ExecutionError,
    fail_fast: bool,
) -> ActionDisposition {
    match error {
        ExecutionError::Domain(e) if e.is_terminal() || fail_fast || component.fail_fast() => {
            ActionDisposition::Abort(e)
        }
        ExecutionError::Domain(e) => ActionDisposition::Continue(Some(e)),
        ExecutionError::ExtensionMismatch(detail) => {
            ActionDisposition::Abort(extension_mismatch(detail))
        }
        ExecutionError::Cancelled => ActionDisposition::Continue(None),
        ExecutionError::Unexpected(source) => ActionDisposition::Abort(
            ComponentError::workload(
                ErrorReason::CriticalWorkloadFailure,
                format!(
                    "Action execution failed for component '{}'.",
                    component.type_name()
                ),
            )
            .with_source(source),
        ),
    }
}

/// Monitor failures always abort. `None` means the monitor observed
/// cancellation.
pub fn classify_monitor_error(
    component: &Component,
    error: ExecutionError,
) -> Option<ComponentError> {
    match error {
        ExecutionError::Domain(e) => Some(e),
        ExecutionError::ExtensionMismatch(detail) => Some(extension_mismatch(detail)),
        ExecutionError::Cancelled => None,
        ExecutionError::Unexpected(source) => Some(
            ComponentError::monitor(
                ErrorReason::MonitorFailed,
                format!(
                    "Monitor execution failed for component '{}'.",
                    component.type_name()
                ),
            )
            .with_source(source),
        ),
    }
}
