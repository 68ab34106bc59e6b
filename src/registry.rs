//! Registry of files currently selected into a stream.

use std::collections::BTreeMap;

use crate::file::{DiffCommand, FileDiff, FileRecord};

/// Filename-keyed collection of file records.
///
/// Each stream owns one registry of the files its selector currently matches.
/// Iteration order is stable (sorted by filename) so pass output is
/// deterministic.
#[derive(Debug, Default, Clone)]
pub struct FileRegistry {
    files: BTreeMap<String, FileRecord>,
}

impl FileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `file` keyed by filename unless already present; `force`
    /// overwrites an existing entry.
    pub fn add(&mut self, file: FileRecord, force: bool) {
        if force || !self.files.contains_key(&file.filename) {
            self.files.insert(file.filename.clone(), file);
        }
    }

    /// Look up a record by filename.
    pub fn get(&self, filename: &str) -> Option<&FileRecord> {
        self.files.get(filename)
    }

    /// Whether a record exists for `filename`.
    pub fn has(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    /// Delete the entry for `filename`.
    pub fn remove(&mut self, filename: &str) {
        self.files.remove(filename);
    }

    /// Mark an existing entry stale by dropping its content. The entry stays
    /// selected but downstream stages must reload it.
    pub fn invalidate(&mut self, filename: &str) {
        if let Some(file) = self.files.get_mut(filename) {
            file.content = None;
        }
    }

    /// Apply a diff: add inserts, change invalidates, remove deletes.
    pub fn update(&mut self, diff: &FileDiff) {
        match diff.command {
            DiffCommand::Add => {
                self.add(
                    FileRecord { filename: diff.filename.clone(), content: diff.content.clone() },
                    false,
                );
            }
            DiffCommand::Change => self.invalidate(&diff.filename),
            DiffCommand::Remove => self.remove(&diff.filename),
        }
    }

    /// Snapshot of all contained records.
    pub fn values(&self) -> Vec<FileRecord> {
        self.files.values().cloned().collect()
    }

    /// Copy all entries from `other` into this registry, overwriting on key
    /// collision.
    pub fn merge(&mut self, other: &FileRegistry) {
        for file in other.files.values() {
            self.files.insert(file.filename.clone(), file.clone());
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
