// src/types.rs

//! Small shared enums used across the profile model, the engine and the
//! error taxonomy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which profile list a component was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Dependency,
    Action,
    Monitor,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentKind::Dependency => "Dependency",
            ComponentKind::Action => "Action",
            ComponentKind::Monitor => "Monitor",
        };
        f.write_str(s)
    }
}

/// How strictly a deadline interrupts in-flight work.
///
/// - `None`: the deadline is checked against the wall clock continuously.
/// - `IndividualAction`: the deadline is only honoured once the running action
///   completes.
/// - `AllActions`: the deadline is only honoured once the whole round of
///   actions (the iteration) completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeterminismScope {
    #[default]
    None,
    IndividualAction,
    AllActions,
}

impl FromStr for DeterminismScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(DeterminismScope::None),
            "deterministic" => Ok(DeterminismScope::IndividualAction),
            "deterministic*" => Ok(DeterminismScope::AllActions),
            other => Err(format!(
                "invalid determinism hint: {other} (expected \"deterministic\" or \"deterministic*\")"
            )),
        }
    }
}

/// Numeric failure reasons. The value doubles as a severity: anything at or
/// above [`ErrorReason::TERMINAL_THRESHOLD`] cannot succeed by retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorReason {
    Undefined = 0,
    PerformanceCounterNotFound = 100,
    MonitorUnexpectedAnomaly = 101,
    DiskInformationNotAvailable = 300,
    DiskFilterNotSupported = 301,
    WorkloadResultsNotFound = 314,
    WorkloadFailed = 315,
    WorkloadResultsParsingFailed = 316,
    MonitorFailed = 318,
    HttpNonSuccessResponse = 320,
    Http400BadRequestResponse = 321,
    Http404NotFoundResponse = 322,
    Http409ConflictResponse = 323,
    Http403ForbiddenResponse = 324,
    Http412PreconditionFailedResponse = 325,
    InvalidResults = 400,
    ApiStatePollingTimeout = 410,
    ApiRequestFailed = 411,
    SystemMemoryReadFailed = 420,
    WorkloadUnexpectedAnomaly = 430,
    FileUploadNotificationCreationFailed = 440,
    ProfileNotFound = 500,
    InvalidProfileDefinition = 501,
    NotSupported = 502,
    PlatformNotSupported = 503,
    ProcessorArchitectureNotSupported = 504,
    DependencyDescriptionInvalid = 505,
    DependencyInstallationFailed = 506,
    DependencyNotFound = 507,
    EnvironmentIsInsufficent = 508,
    InstructionsNotValid = 510,
    InstructionsNotProvided = 511,
    InvalidOrMissingLicense = 512,
    DiskFormatFailed = 515,
    DiskMountFailed = 516,
    SystemOperationFailed = 517,
    LinuxDistributionNotSupported = 518,
    NetworkTargetDoesNotExist = 520,
    WorkloadNotFound = 525,
    WorkloadDependencyMissing = 526,
    CriticalWorkloadFailure = 527,
    PackageStoreNotDefined = 530,
    ApiStartupFailed = 535,
    Unauthorized = 540,
    EnvironmentLayoutNotDefined = 550,
    LayoutInvalid = 551,
    ExtensionAssemblyInvalid = 580,
    DuplicateExtensionsFound = 581,
    DuplicatePackagesFound = 582,
    VersionNotSupported = 590,
}

impl ErrorReason {
    pub const TERMINAL_THRESHOLD: i32 = 500;

    pub fn code(self) -> i32 {
        self as i32
    }

    /// True when a failure with this reason must abort the whole run.
    pub fn is_terminal(self) -> bool {
        self.code() >= Self::TERMINAL_THRESHOLD
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Boxed, `Send` future used at the crate's async trait seams.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
