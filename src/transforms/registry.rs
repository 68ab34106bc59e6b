//! Plugin registry for transforms.
//!
//! Chains are composed by looking a transform up by name and instantiating
//! it through its registered factory, instead of installing shortcuts on a
//! shared builder type.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::transform::Transform;

type Factory = Box<dyn Fn() -> Arc<dyn Transform> + Send + Sync>;

/// Name-to-factory mapping for transform plugins.
pub struct TransformRegistry {
    factories: BTreeMap<String, Factory>,
}

impl TransformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Registry pre-loaded with the built-in `read` and `write` plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("read", || Arc::new(super::ReadTransform::new()));
        registry.register("write", || Arc::new(super::WriteTransform::new()));
        registry
    }

    /// Register a factory under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Transform> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Instantiate the transform registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.factories.get(name).map(|f| f())
    }

    /// Whether a plugin is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
