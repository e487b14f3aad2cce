// src/config/mod.rs

//! Profile and agent-settings loading.
//!
//! Responsibilities:
//! - Define the JSON/YAML-backed profile model (`model.rs`).
//! - Load a profile from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Read the optional TOML agent settings (`settings.rs`).
//! - Mask secrets before parameters are printed (`redact.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod redact;
pub mod settings;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ExecutionProfile, ExecutionProfileElement, Metadata, ParameterValue, Parameters,
    RawExecutionProfile,
};
pub use settings::{AgentSection, AgentSettings};
