// src/component/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use super::ComponentHandler;
use super::builtin;

pub type HandlerConstructor = Arc<dyn Fn() -> Box<dyn ComponentHandler> + Send + Sync>;

/// Maps profile `Type` names to handler constructors.
///
/// Lookups are exact: `"ExecuteCommand"` and `"executecommand"` are
/// different types.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    constructors: BTreeMap<String, HandlerConstructor>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in component types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) a component type.
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn ComponentHandler> + Send + Sync + 'static,
    {
        self.constructors
            .insert(type_name.into(), Arc::new(constructor));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// A fresh handler for `type_name`, if registered.
    pub fn create(&self, type_name: &str) -> Option<Box<dyn ComponentHandler>> {
        self.constructors.get(type_name).map(|ctor| ctor())
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
