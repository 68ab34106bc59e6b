//! Dependency map between files.
//!
//! Records "X depends on Y" edges reported by transform stages and answers
//! the reverse question during incremental rebuilds: given a changed file,
//! which files depend on it (directly or transitively) and must be rebuilt?
//!
//! Edges may form cycles; resolution terminates regardless because the
//! result set doubles as the visited guard, so a key is expanded at most
//! once per query.

use std::collections::{BTreeMap, BTreeSet};

/// Mapping from a dependent key to the set of keys it depends on.
#[derive(Debug, Default, Clone)]
pub struct DependencyMap {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert edges `dependent -> dep` for each dependency.
    ///
    /// Self-edges are dropped silently. Duplicate edges are no-ops.
    pub fn add<S: AsRef<str>>(
        &mut self,
        dependent: &str,
        dependencies: impl IntoIterator<Item = S>,
    ) {
        let deps = self.edges.entry(dependent.to_string()).or_default();
        for dep in dependencies {
            let dep = dep.as_ref();
            if dep != dependent {
                deps.insert(dep.to_string());
            }
        }
    }

    /// Remove all outgoing edges for `key`, or every edge when `key` is
    /// `None`.
    pub fn clear(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.edges.remove(key);
            }
            None => self.edges.clear(),
        }
    }

    /// Resolve the deduplicated set of keys that depend on any of `keys`,
    /// directly or transitively, excluding the queried keys themselves.
    pub fn resolve<S: AsRef<str>>(&self, keys: impl IntoIterator<Item = S>) -> Vec<String> {
        let roots: BTreeSet<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        let mut result: Vec<String> = Vec::new();

        for root in &roots {
            let mut work = vec![root.clone()];
            while let Some(key) = work.pop() {
                for (dependent, deps) in &self.edges {
                    if deps.contains(&key)
                        && dependent != &key
                        && !roots.contains(dependent)
                        && !result.iter().any(|r| r == dependent)
                    {
                        result.push(dependent.clone());
                        work.push(dependent.clone());
                    }
                }
            }
        }

        result
    }

    /// Number of dependent keys with recorded edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the map holds no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether `dependent` has any recorded outgoing edges.
    pub fn contains(&self, dependent: &str) -> bool {
        self.edges.contains_key(dependent)
    }
}
