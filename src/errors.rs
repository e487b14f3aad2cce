// src/errors.rs

//! Crate-wide error types.
//!
//! - [`AgentError`] is what library entry points return.
//! - [`ComponentError`] is the typed domain failure a component raises; its
//!   [`ErrorReason`] decides whether the run aborts or carries on.
//! - [`ExecutionError`] is the full set of shapes a component's `execute`
//!   may fail with. Only the engine interprets it.

use std::fmt;

use thiserror::Error;

use crate::types::ErrorReason;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Profile format error: {0}")]
    ProfileFormat(String),

    #[error(
        "Invalid profile definition. The component '{0}' is not a valid profile component \
         because it is not registered. If it is provided by an extension, ensure the \
         extension is loaded before the profile is executed."
    )]
    ComponentTypeNotFound(String),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<toml::de::Error> for AgentError {
    fn from(err: toml::de::Error) -> Self {
        AgentError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::ProfileFormat(err.to_string())
    }
}

impl From<serde_yaml::Error> for AgentError {
    fn from(err: serde_yaml::Error) -> Self {
        AgentError::ProfileFormat(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentError>;

/// Family of a domain failure. Mirrors the area of the system that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Dependency,
    Workload,
    WorkloadResults,
    Monitor,
    Api,
    EnvironmentSetup,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Dependency => "dependency",
            FailureKind::Workload => "workload",
            FailureKind::WorkloadResults => "workload results",
            FailureKind::Monitor => "monitor",
            FailureKind::Api => "api",
            FailureKind::EnvironmentSetup => "environment setup",
        };
        f.write_str(s)
    }
}

/// Typed domain failure raised by components, package management and the
/// engine itself.
#[derive(Error, Debug)]
#[error("{kind} error [{reason}]: {message}")]
pub struct ComponentError {
    pub kind: FailureKind,
    pub reason: ErrorReason,
    pub message: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl ComponentError {
    pub fn new(kind: FailureKind, reason: ErrorReason, message: impl Into<String>) -> Self {
        Self {
            kind,
            reason,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn dependency(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Dependency, reason, message)
    }

    pub fn workload(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Workload, reason, message)
    }

    pub fn monitor(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Monitor, reason, message)
    }

    pub fn is_terminal(&self) -> bool {
        self.reason.is_terminal()
    }
}

/// Every way a component invocation can fail.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A recognised domain failure carrying a severity.
    #[error(transparent)]
    Domain(#[from] ComponentError),

    /// The component was built against an incompatible extension contract.
    #[error("extension contract mismatch: {0}")]
    ExtensionMismatch(String),

    /// The invocation observed cancellation and stopped early.
    #[error("operation cancelled")]
    Cancelled,

    /// Anything the component did not classify.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<std::io::Error> for ExecutionError {
    fn from(err: std::io::Error) -> Self {
        ExecutionError::Unexpected(err.into())
    }
}
