// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix marking an element parameter as a reference to a profile-level
/// parameter (e.g. `"$.Parameters.PackageName"`).
pub const PARAMETER_REFERENCE_PREFIX: &str = "$.Parameters.";

/// A primitive parameter or metadata value.
///
/// Profiles only ever carry primitives here; richer structures belong in the
/// element's extensions bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Booleans are accepted either natively or as `"true"`/`"false"` strings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            ParameterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(i) => Some(*i),
            ParameterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Integer(i) => write!(f, "{i}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::String(s.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> Self {
        ParameterValue::String(s)
    }
}

impl From<bool> for ParameterValue {
    fn from(b: bool) -> Self {
        ParameterValue::Bool(b)
    }
}

impl From<i64> for ParameterValue {
    fn from(i: i64) -> Self {
        ParameterValue::Integer(i)
    }
}

/// String-keyed bag of primitives with case-insensitive key lookup.
///
/// Used for parameters and metadata alike. Inserting a key that differs only
/// in case replaces the existing entry (keeping the new spelling).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParameterValue>);

/// Metadata uses the same representation as parameters.
pub type Metadata = Parameters;

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParameterValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        let key = key.into();
        self.0.retain(|k, _| !k.eq_ignore_ascii_case(&key));
        self.0.insert(key, value.into());
    }

    /// Merge `other` into `self`.
    ///
    /// With `replace = false`, keys already present are left untouched.
    pub fn merge(&mut self, other: &Parameters, replace: bool) {
        for (key, value) in other.iter() {
            if replace || !self.contains_key(key) {
                self.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut ParameterValue)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParameterValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// A single declared component in a profile.
///
/// ```json
/// {
///   "Type": "ExecuteCommand",
///   "Metadata": { "Owner": "perf" },
///   "Parameters": { "Scenario": "Warmup", "Command": "echo hi" },
///   "Notes": ["anything else is kept as an extension"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionProfileElement {
    /// Registered component type name.
    #[serde(rename = "Type", default)]
    pub component_type: String,

    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default)]
    pub metadata: Metadata,

    /// Every other key in the element.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ExecutionProfileElement {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            parameters: Parameters::new(),
            metadata: Metadata::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// The `Scenario` parameter, if declared.
    pub fn scenario(&self) -> Option<&str> {
        self.parameters.get_str("Scenario")
    }
}

/// Profile exactly as read from disk, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawExecutionProfile {
    #[serde(default)]
    pub description: Option<String>,

    /// `hh:mm:ss` or a short form like `"30s"`.
    #[serde(default)]
    pub minimum_execution_interval: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default)]
    pub dependencies: Vec<ExecutionProfileElement>,

    #[serde(default)]
    pub actions: Vec<ExecutionProfileElement>,

    #[serde(default)]
    pub monitors: Vec<ExecutionProfileElement>,
}

/// Validated, immutable profile handed to the executor.
///
/// Construct via `ExecutionProfile::try_from(raw)` (see `validate.rs`) or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct ExecutionProfile {
    pub description: Option<String>,
    pub minimum_execution_interval: Option<Duration>,
    pub metadata: Metadata,
    pub parameters: Parameters,
    pub dependencies: Vec<ExecutionProfileElement>,
    pub actions: Vec<ExecutionProfileElement>,
    pub monitors: Vec<ExecutionProfileElement>,
}

impl ExecutionProfile {
    /// Assemble a profile without running validation. Used by `TryFrom`.
    pub(crate) fn new_unchecked(raw: RawExecutionProfile, interval: Option<Duration>) -> Self {
        Self {
            description: raw.description,
            minimum_execution_interval: interval,
            metadata: raw.metadata,
            parameters: raw.parameters,
            dependencies: raw.dependencies,
            actions: raw.actions,
            monitors: raw.monitors,
        }
    }
}
