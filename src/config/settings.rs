// src/config/settings.rs

//! Optional agent settings (`profilerun.toml`).
//!
//! ```toml
//! [agent]
//! exit_wait = "30s"
//! fail_fast = false
//! randomization_seed = 777
//! packages_dir = "packages"
//! blob_store_dir = "blobs"
//! log_level = "debug"
//!
//! [metadata]
//! ExperimentId = "abc"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::config::model::Metadata;
use crate::errors::{AgentError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSection {
    /// Grace period after cancellation, e.g. `"10s"`.
    #[serde(default)]
    pub exit_wait: Option<String>,

    #[serde(default)]
    pub fail_fast: Option<bool>,

    #[serde(default)]
    pub randomization_seed: Option<i64>,

    #[serde(default)]
    pub packages_dir: Option<PathBuf>,

    #[serde(default)]
    pub blob_store_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl AgentSettings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let settings: AgentSettings = toml::from_str(&contents)?;
        settings.exit_wait()?;
        Ok(settings)
    }

    pub fn exit_wait(&self) -> Result<Option<Duration>> {
        self.agent
            .exit_wait
            .as_deref()
            .map(|s| parse_duration(s).map_err(|e| AgentError::ConfigError(format!("exit_wait: {e}"))))
            .transpose()
    }
}
