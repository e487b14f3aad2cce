// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ExecutionProfile, RawExecutionProfile};
use crate::errors::{AgentError, Result};

/// On-disk encodings a profile may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    Json,
    Yaml,
}

impl ProfileFormat {
    /// Pick the format from the file extension. Unknown extensions are read
    /// as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ProfileFormat::Yaml,
            _ => ProfileFormat::Json,
        }
    }
}

/// Load a profile from a given path and return the raw `RawExecutionProfile`.
///
/// This only performs deserialization; it does **not** validate the profile.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawExecutionProfile> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AgentError::ConfigError(format!(
            "profile not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path)?;
    parse_profile(&contents, ProfileFormat::from_path(path))
}

/// Parse profile text in the given format.
pub fn parse_profile(contents: &str, format: ProfileFormat) -> Result<RawExecutionProfile> {
    let raw = match format {
        ProfileFormat::Json => serde_json::from_str(contents)?,
        ProfileFormat::Yaml => serde_yaml::from_str(contents)?,
    };
    Ok(raw)
}

/// Load a profile from path and run validation.
///
/// - Reads JSON or YAML (by extension).
/// - Parses `MinimumExecutionInterval`.
/// - Checks that the profile declares something to run and that every
///   element names a component type.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ExecutionProfile> {
    let raw = load_from_path(&path)?;
    ExecutionProfile::try_from(raw)
}

/// Default location of the agent settings file.
pub fn default_settings_path() -> PathBuf {
    PathBuf::from("profilerun.toml")
}
