// src/component/mod.rs

//! Runtime components: what a profile element turns into.
//!
//! A [`Component`] wraps a type-specific [`ComponentHandler`] together with
//! the element's parameters, metadata and extensions. The executor owns the
//! components it creates and is the only caller of [`Component::execute`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::duration::parse_duration;
use crate::config::model::{Metadata, ParameterValue, Parameters};
use crate::engine::activity::ActivityContext;
use crate::errors::{ComponentError, ExecutionError, FailureKind};
use crate::types::{BoxFuture, ComponentKind, ErrorReason};

pub mod builtin;
pub mod expression;
pub mod factory;
pub mod platform;
pub mod registry;
pub mod services;

pub use expression::{ExpressionEvaluator, ProfileExpressionEvaluator};
pub use factory::{ComponentFactory, ScenarioFilter};
pub use platform::Platform;
pub use registry::ComponentRegistry;
pub use services::Services;

pub const DEFAULT_RANDOMIZATION_SEED: i64 = 777;

pub type ComponentFuture<'a> = BoxFuture<'a, Result<(), ExecutionError>>;

/// Type-specific behaviour of a component.
///
/// Implementations must honour `ctx.cancel` and report failure only through
/// [`ExecutionError`].
pub trait ComponentHandler: Send + Sync {
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> ComponentFuture<'a>;

    /// Platform veto, checked once when the component is created.
    fn is_supported(&self, _platform: &Platform, _parameters: &Parameters) -> bool {
        true
    }

    fn dispose(&self) {}
}

/// Everything a handler sees for one invocation.
pub struct ExecutionContext {
    pub component_type: String,
    pub kind: ComponentKind,
    pub scenario: Option<String>,
    pub parameters: Parameters,
    pub metadata: Metadata,
    pub extensions: BTreeMap<String, serde_json::Value>,
    pub randomization_seed: i64,
    pub services: Services,
    pub activity: ActivityContext,
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn parameter(&self, key: &str) -> Option<&ParameterValue> {
        self.parameters.get(key)
    }

    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get_str(key)
    }

    /// A parameter that must be present and non-empty.
    pub fn require_str(&self, key: &str) -> Result<&str, ComponentError> {
        match self.parameter_str(key).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ComponentError::new(
                self.failure_kind(),
                ErrorReason::InvalidProfileDefinition,
                format!(
                    "component '{}' requires the '{}' parameter",
                    self.component_type, key
                ),
            )),
        }
    }

    pub fn parameter_bool(&self, key: &str) -> bool {
        self.parameter(key)
            .and_then(ParameterValue::as_bool)
            .unwrap_or(false)
    }

    /// A duration parameter (`hh:mm:ss`, `30s`, ...). Missing yields `None`.
    pub fn parameter_duration(&self, key: &str) -> Result<Option<Duration>, ComponentError> {
        let Some(value) = self.parameter(key) else {
            return Ok(None);
        };
        if let Some(secs) = value.as_i64() {
            return Ok(Some(Duration::from_secs(secs.max(0) as u64)));
        }
        parse_duration(&value.to_string()).map(Some).map_err(|e| {
            ComponentError::new(
                self.failure_kind(),
                ErrorReason::InvalidProfileDefinition,
                format!("component '{}' parameter '{}': {}", self.component_type, key, e),
            )
        })
    }

    pub fn require_duration(&self, key: &str) -> Result<Duration, ComponentError> {
        match self.parameter_duration(key)? {
            Some(d) => Ok(d),
            None => Err(ComponentError::new(
                self.failure_kind(),
                ErrorReason::InvalidProfileDefinition,
                format!(
                    "component '{}' requires the '{}' parameter",
                    self.component_type, key
                ),
            )),
        }
    }

    /// Failure family matching the list this component was declared in.
    pub fn failure_kind(&self) -> FailureKind {
        match self.kind {
            ComponentKind::Dependency => FailureKind::Dependency,
            ComponentKind::Action => FailureKind::Workload,
            ComponentKind::Monitor => FailureKind::Monitor,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A runnable component created from a profile element.
pub struct Component {
    type_name: String,
    kind: ComponentKind,
    scenario: Option<String>,
    parameters: Mutex<Parameters>,
    metadata: Metadata,
    extensions: BTreeMap<String, serde_json::Value>,
    fail_fast: bool,
    randomization_seed: i64,
    handler: Box<dyn ComponentHandler>,
    expressions_evaluated: AtomicBool,
    disposed: AtomicBool,
}

impl Component {
    pub fn new(
        type_name: impl Into<String>,
        kind: ComponentKind,
        parameters: Parameters,
        handler: Box<dyn ComponentHandler>,
    ) -> Self {
        let scenario = parameters.get_str("Scenario").map(str::to_string);
        Self {
            type_name: type_name.into(),
            kind,
            scenario,
            parameters: Mutex::new(parameters),
            metadata: Metadata::new(),
            extensions: BTreeMap::new(),
            fail_fast: false,
            randomization_seed: DEFAULT_RANDOMIZATION_SEED,
            handler,
            expressions_evaluated: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_extensions(mut self, extensions: BTreeMap<String, serde_json::Value>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_randomization_seed(mut self, seed: i64) -> Self {
        self.randomization_seed = seed;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extensions
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn handler(&self) -> &dyn ComponentHandler {
        self.handler.as_ref()
    }

    fn lock_parameters(&self) -> MutexGuard<'_, Parameters> {
        self.parameters.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current parameters.
    pub fn parameters(&self) -> Parameters {
        self.lock_parameters().clone()
    }

    pub fn set_parameter(&self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        self.lock_parameters().insert(key, value);
    }

    /// Run the handler once.
    ///
    /// Placeholder expressions in the parameters are evaluated in place before
    /// the first invocation. A failed evaluation is retried on the next call.
    pub async fn execute(
        &self,
        services: &Services,
        activity: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError> {
        if !self.expressions_evaluated.load(Ordering::SeqCst) {
            let mut parameters = self.parameters();
            services.evaluator.evaluate(services, &mut parameters).await?;
            *self.lock_parameters() = parameters;
            self.expressions_evaluated.store(true, Ordering::SeqCst);
        }

        let ctx = ExecutionContext {
            component_type: self.type_name.clone(),
            kind: self.kind,
            scenario: self.scenario.clone(),
            parameters: self.parameters(),
            metadata: self.metadata.clone(),
            extensions: self.extensions.clone(),
            randomization_seed: self.randomization_seed,
            services: services.clone(),
            activity: *activity,
            cancel: cancel.clone(),
        };

        self.handler.execute(&ctx).await
    }

    /// Release the handler. Returns `false` if it was already disposed.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.handler.dispose();
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("scenario", &self.scenario)
            .field("fail_fast", &self.fail_fast)
            .finish_non_exhaustive()
    }
}
