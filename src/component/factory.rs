// src/component/factory.rs

//! Turns profile elements into runnable components.
//!
//! Per element, in order:
//! 1. scenario include/exclude filtering,
//! 2. type resolution through the [`ComponentRegistry`] (unknown types are a
//!    fatal load error),
//! 3. `$.Parameters.<Name>` reference resolution,
//! 4. metadata merge (global first, element metadata wins),
//! 5. platform gating (unsupported components are skipped),
//! 6. extensions merge, then `ComponentCreated` is published.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::platform::Platform;
use super::registry::ComponentRegistry;
use super::{Component, ComponentHandler};
use crate::config::model::{
    ExecutionProfileElement, Metadata, ParameterValue, Parameters, PARAMETER_REFERENCE_PREFIX,
};
use crate::engine::events::{EventBus, ProfileEvent};
use crate::errors::{AgentError, Result};
use crate::types::ComponentKind;

/// Include/exclude scenario names, as given on the command line
/// (`"Scenario1,-Scenario2"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioFilter {
    pub include: Vec<String>,
    /// Stored without the leading `-`.
    pub exclude: Vec<String>,
}

impl ScenarioFilter {
    /// Split user-supplied scenarios into includes (no `-` prefix) and
    /// excludes (`-` prefix).
    pub fn from_scenarios<S: AsRef<str>>(scenarios: &[S]) -> Self {
        let mut filter = ScenarioFilter::default();
        for scenario in scenarios {
            let scenario = scenario.as_ref().trim();
            if scenario.is_empty() {
                continue;
            }
            match scenario.strip_prefix('-') {
                Some(name) => filter.exclude.push(name.trim().to_string()),
                None => filter.include.push(scenario.to_string()),
            }
        }
        filter
    }

    /// The same filter without its includes. Used for dependencies and
    /// monitors, which only honour excludes.
    pub fn excludes_only(&self) -> Self {
        ScenarioFilter {
            include: Vec::new(),
            exclude: self.exclude.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether an element with `scenario` survives the filter.
    ///
    /// With includes present only listed scenarios pass, and an included
    /// scenario is never dropped by an exclude of the same name.
    pub fn allows(&self, scenario: Option<&str>) -> bool {
        if !self.include.is_empty() {
            return matches_any(scenario, &self.include);
        }
        !matches_any(scenario, &self.exclude)
    }
}

fn matches_any(scenario: Option<&str>, names: &[String]) -> bool {
    match scenario.map(str::trim) {
        Some(s) if !s.is_empty() => names.iter().any(|n| n.eq_ignore_ascii_case(s)),
        _ => false,
    }
}

/// Lower-case the first character: `ExperimentId` -> `experimentId`.
pub fn camel_cased(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Inputs shared by every `create_components` call of one run.
pub struct ComponentFactory<'a> {
    pub registry: &'a ComponentRegistry,
    pub platform: Platform,
    pub global_metadata: &'a Metadata,
    pub profile_parameters: &'a Parameters,
    pub fail_fast: bool,
    pub randomization_seed: i64,
    pub events: &'a EventBus,
}

impl ComponentFactory<'_> {
    pub fn create_components(
        &self,
        kind: ComponentKind,
        elements: &[ExecutionProfileElement],
        filter: &ScenarioFilter,
    ) -> Result<Vec<Arc<Component>>> {
        let mut components = Vec::with_capacity(elements.len());

        for element in elements {
            if !filter.allows(element.scenario()) {
                debug!(
                    kind = %kind,
                    component_type = %element.component_type,
                    scenario = ?element.scenario(),
                    "component filtered out by scenario"
                );
                continue;
            }

            let handler = self
                .registry
                .create(&element.component_type)
                .ok_or_else(|| AgentError::ComponentTypeNotFound(element.component_type.clone()))?;

            let parameters = self.resolve_references(&element.parameters);

            let mut metadata = Metadata::new();
            for (key, value) in self.global_metadata.iter() {
                metadata.insert(camel_cased(key), value.clone());
            }
            metadata.merge(&element.metadata, true);

            let fail_fast = self.fail_fast
                || parameters
                    .get("FailFast")
                    .and_then(ParameterValue::as_bool)
                    .unwrap_or(false);

            if !self.is_supported(handler.as_ref(), &parameters) {
                info!(
                    kind = %kind,
                    component_type = %element.component_type,
                    platform = %self.platform,
                    "component not supported on this platform; skipping"
                );
                continue;
            }

            let mut extensions = BTreeMap::new();
            for (key, value) in element.extensions.iter() {
                extensions.insert(key.clone(), value.clone());
            }

            let component = Component::new(element.component_type.clone(), kind, parameters, handler)
                .with_metadata(metadata)
                .with_extensions(extensions)
                .with_fail_fast(fail_fast)
                .with_randomization_seed(self.randomization_seed);

            self.events.publish(&ProfileEvent::ComponentCreated {
                kind,
                component_type: component.type_name().to_string(),
                scenario: component.scenario().map(str::to_string),
            });

            components.push(Arc::new(component));
        }

        Ok(components)
    }

    fn is_supported(&self, handler: &dyn ComponentHandler, parameters: &Parameters) -> bool {
        let listed = match parameters.get_str("SupportedPlatforms") {
            Some(list) if !list.trim().is_empty() => self.platform.is_listed_in(list),
            _ => true,
        };
        listed && handler.is_supported(&self.platform, parameters)
    }

    /// Replace `$.Parameters.<Name>` values with the profile-level parameter.
    /// Unknown references are kept verbatim.
    fn resolve_references(&self, parameters: &Parameters) -> Parameters {
        let mut resolved = parameters.clone();
        for (key, value) in resolved.iter_mut() {
            let Some(reference) = value
                .as_str()
                .and_then(|s| s.trim().strip_prefix(PARAMETER_REFERENCE_PREFIX))
                .map(str::to_string)
            else {
                continue;
            };
            match self.profile_parameters.get(&reference) {
                Some(profile_value) => *value = profile_value.clone(),
                None => debug!(parameter = %key, %reference, "unresolved profile parameter reference"),
            }
        }
        resolved
    }
}
