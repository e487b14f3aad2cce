#![allow(dead_code)]

use profilerun::config::{
    ExecutionProfile, ExecutionProfileElement, ParameterValue, RawExecutionProfile,
};

/// Builder for `ExecutionProfile` to simplify test setup.
pub struct ProfileBuilder {
    profile: RawExecutionProfile,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self {
            profile: RawExecutionProfile::default(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.profile.description = Some(description.to_string());
        self
    }

    pub fn minimum_interval(mut self, interval: &str) -> Self {
        self.profile.minimum_execution_interval = Some(interval.to_string());
        self
    }

    pub fn metadata(mut self, key: &str, value: impl Into<ParameterValue>) -> Self {
        self.profile.metadata.insert(key, value);
        self
    }

    pub fn parameter(mut self, key: &str, value: impl Into<ParameterValue>) -> Self {
        self.profile.parameters.insert(key, value);
        self
    }

    pub fn dependency(mut self, element: impl Into<ExecutionProfileElement>) -> Self {
        self.profile.dependencies.push(element.into());
        self
    }

    pub fn action(mut self, element: impl Into<ExecutionProfileElement>) -> Self {
        self.profile.actions.push(element.into());
        self
    }

    pub fn monitor(mut self, element: impl Into<ExecutionProfileElement>) -> Self {
        self.profile.monitors.push(element.into());
        self
    }

    pub fn build_raw(self) -> RawExecutionProfile {
        self.profile
    }

    pub fn build(self) -> ExecutionProfile {
        ExecutionProfile::try_from(self.profile)
            .expect("Failed to build valid profile from builder")
    }
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a single profile element.
pub struct ElementBuilder {
    element: ExecutionProfileElement,
}

impl ElementBuilder {
    pub fn new(component_type: &str) -> Self {
        Self {
            element: ExecutionProfileElement::new(component_type),
        }
    }

    /// Element with a `Name` parameter, which the fake components record.
    pub fn named(component_type: &str, name: &str) -> Self {
        Self::new(component_type).parameter("Name", name)
    }

    pub fn scenario(self, scenario: &str) -> Self {
        self.parameter("Scenario", scenario)
    }

    pub fn fail_fast(self) -> Self {
        self.parameter("FailFast", true)
    }

    pub fn parameter(mut self, key: &str, value: impl Into<ParameterValue>) -> Self {
        self.element.parameters.insert(key, value);
        self
    }

    pub fn metadata(mut self, key: &str, value: impl Into<ParameterValue>) -> Self {
        self.element.metadata.insert(key, value);
        self
    }

    pub fn build(self) -> ExecutionProfileElement {
        self.element
    }
}

impl From<ElementBuilder> for ExecutionProfileElement {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}
