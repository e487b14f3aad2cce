// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{ExecutionProfile, ExecutionProfileElement, RawExecutionProfile};
use crate::errors::{AgentError, Result};

impl TryFrom<RawExecutionProfile> for ExecutionProfile {
    type Error = AgentError;

    fn try_from(raw: RawExecutionProfile) -> std::result::Result<Self, Self::Error> {
        validate_raw_profile(&raw)?;
        let interval = match raw.minimum_execution_interval.as_deref() {
            Some(s) if !s.trim().is_empty() => Some(parse_duration(s).map_err(|e| {
                AgentError::ConfigError(format!("MinimumExecutionInterval: {e}"))
            })?),
            _ => None,
        };
        Ok(ExecutionProfile::new_unchecked(raw, interval))
    }
}

fn validate_raw_profile(profile: &RawExecutionProfile) -> Result<()> {
    ensure_has_components(profile)?;
    validate_elements("Dependencies", &profile.dependencies)?;
    validate_elements("Actions", &profile.actions)?;
    validate_elements("Monitors", &profile.monitors)?;
    Ok(())
}

fn ensure_has_components(profile: &RawExecutionProfile) -> Result<()> {
    if profile.dependencies.is_empty() && profile.actions.is_empty() && profile.monitors.is_empty()
    {
        return Err(AgentError::ConfigError(
            "profile must declare at least one of Dependencies, Actions or Monitors".to_string(),
        ));
    }
    Ok(())
}

fn validate_elements(section: &str, elements: &[ExecutionProfileElement]) -> Result<()> {
    for (index, element) in elements.iter().enumerate() {
        if element.component_type.trim().is_empty() {
            return Err(AgentError::ConfigError(format!(
                "{section}[{index}] is missing a component `Type`"
            )));
        }
    }
    Ok(())
}
