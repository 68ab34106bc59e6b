//! Streams: selection, transform chains, and per-stage output caches.
//!
//! A stream selects files by glob pattern (or catches everything unmatched)
//! and pushes them through an ordered chain of transform stages. Chains live
//! in a [`StageArena`]: each stage is a node with an integer parent index,
//! so cache purges and execution walk a flat list instead of recursing
//! through an object graph. Two streams registered with a shared chain
//! prefix share the prefix nodes, and therefore share their caches, which is
//! what makes fan-out reuse of upstream output cheap.

use std::collections::HashMap;
use std::sync::Arc;

use glob::Pattern;
use rayon::prelude::*;

use crate::error::Error;
use crate::file::{DiffCommand, FileDiff, FileRecord};
use crate::registry::FileRegistry;
use crate::transform::{Transform, TransformContext, TransformError};

/// Compiled glob selection for a stream.
#[derive(Debug, Clone)]
pub struct Selector {
    patterns: Vec<Pattern>,
}

impl Selector {
    /// Compile one or more glob patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            compiled.push(Pattern::new(pattern).map_err(|source| Error::Selection {
                pattern: pattern.to_string(),
                source,
            })?);
        }
        Ok(Self { patterns: compiled })
    }

    /// Whether any pattern matches the root-relative filename.
    pub fn matches(&self, filename: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(filename))
    }
}

/// Value-type builder for a stream's selection and chain.
///
/// `pipe` appends a stage and returns the extended definition; cloning a
/// definition and piping different stages onto the copies fans the shared
/// upstream out into diverging chains.
#[derive(Clone)]
pub struct StreamDef {
    pub(crate) selector: Option<Selector>,
    pub(crate) stages: Vec<Arc<dyn Transform>>,
    pub(crate) dormant: bool,
}

impl StreamDef {
    pub(crate) fn new(selector: Option<Selector>) -> Self {
        Self { selector, stages: Vec::new(), dormant: false }
    }

    /// Append a transform stage.
    pub fn pipe(mut self, transform: Arc<dyn Transform>) -> Self {
        self.stages.push(transform);
        self
    }

    /// Mark the stream dormant: its chain runs only on the first pass that
    /// executes it, and is skipped thereafter.
    pub fn dormant(mut self) -> Self {
        self.dormant = true;
        self
    }
}

/// One stage in the arena.
struct StageNode {
    transform: Arc<dyn Transform>,
    parent: Option<usize>,
    /// Last outputs per input filename
    cache: HashMap<String, Vec<FileRecord>>,
}

/// Flat storage for all registered transform chains.
#[derive(Default)]
pub(crate) struct StageArena {
    nodes: Vec<StageNode>,
}

impl StageArena {
    /// Intern a chain of stages, reusing nodes for shared prefixes (same
    /// transform instance under the same parent). Returns the terminal node
    /// index, or `None` for an empty chain.
    pub(crate) fn register_chain(&mut self, stages: &[Arc<dyn Transform>]) -> Option<usize> {
        let mut parent: Option<usize> = None;
        for stage in stages {
            let existing = self
                .nodes
                .iter()
                .position(|n| n.parent == parent && Arc::ptr_eq(&n.transform, stage));
            let idx = match existing {
                Some(idx) => idx,
                None => {
                    self.nodes.push(StageNode {
                        transform: Arc::clone(stage),
                        parent,
                        cache: HashMap::new(),
                    });
                    self.nodes.len() - 1
                }
            };
            parent = Some(idx);
        }
        parent
    }

    /// Node indices from chain root to `terminal`.
    fn chain(&self, terminal: Option<usize>) -> Vec<usize> {
        let mut indices = Vec::new();
        let mut cursor = terminal;
        while let Some(idx) = cursor {
            indices.push(idx);
            cursor = self.nodes[idx].parent;
        }
        indices.reverse();
        indices
    }

    /// Drop the cache entry for `filename` at `terminal` and every ancestor.
    /// Upstream-cached output for that file is stale once the file changes.
    pub(crate) fn purge(&mut self, terminal: Option<usize>, filename: &str) {
        let mut cursor = terminal;
        while let Some(idx) = cursor {
            self.nodes[idx].cache.remove(filename);
            cursor = self.nodes[idx].parent;
        }
    }

    /// Drop all nodes and caches.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Fold `files` through the chain ending at `terminal`.
    pub(crate) fn run_chain(
        &mut self,
        terminal: Option<usize>,
        files: Vec<FileRecord>,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        let mut current = files;
        for idx in self.chain(terminal) {
            current = self.run_stage(idx, current, ctx)?;
        }
        Ok(current)
    }

    /// Run one stage over its input set.
    ///
    /// Batch-mode stages see the whole set once and bypass the per-file
    /// cache. Per-file stages reuse cached output where the stage is
    /// cacheable, run the rest on the rayon pool, and commit fresh outputs
    /// to the cache keyed by input filename, preserving input order. Only
    /// non-empty output is cached: a file a stage filtered out must be
    /// offered to the stage again on the next run.
    fn run_stage(
        &mut self,
        idx: usize,
        input: Vec<FileRecord>,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        let transform = Arc::clone(&self.nodes[idx].transform);

        if transform.is_batch() {
            return transform.transform_all(input, ctx);
        }

        enum Slot {
            Cached(Vec<FileRecord>),
            Fresh(FileRecord),
        }

        let cacheable = transform.is_cacheable();
        let cache = &self.nodes[idx].cache;
        let slots: Vec<Slot> = input
            .into_iter()
            .map(|file| {
                if cacheable {
                    if let Some(hit) = cache.get(&file.filename) {
                        return Slot::Cached(hit.clone());
                    }
                }
                Slot::Fresh(file)
            })
            .collect();

        let results: Vec<Result<(Option<String>, Vec<FileRecord>), TransformError>> = slots
            .into_par_iter()
            .map(|slot| match slot {
                Slot::Cached(outputs) => Ok((None, outputs)),
                Slot::Fresh(file) => {
                    let key = file.filename.clone();
                    transform.transform(file, ctx).map(|outputs| (Some(key), outputs))
                }
            })
            .collect();

        let cache = &mut self.nodes[idx].cache;
        let mut flat = Vec::new();
        for result in results {
            let (key, outputs) = result?;
            if cacheable && !outputs.is_empty() {
                if let Some(key) = key {
                    cache.insert(key, outputs.clone());
                }
            }
            flat.extend(outputs);
        }
        Ok(flat)
    }

    #[cfg(test)]
    fn cached(&self, idx: usize, filename: &str) -> bool {
        self.nodes[idx].cache.contains_key(filename)
    }
}

/// A registered terminal stream.
pub struct Stream {
    tag: String,
    selector: Option<Selector>,
    terminal: Option<usize>,
    files: FileRegistry,
    dormant: bool,
    runs: u64,
}

impl Stream {
    pub(crate) fn new(tag: String, selector: Option<Selector>, terminal: Option<usize>, dormant: bool) -> Self {
        Self { tag, selector, terminal, files: FileRegistry::new(), dormant, runs: 0 }
    }

    /// Human-readable tag assigned at registration.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether this stream catches files unmatched by all patterned streams.
    pub fn is_catch_all(&self) -> bool {
        self.selector.is_none()
    }

    /// Whether this stream's pattern matches the filename. Catch-all streams
    /// match nothing here; routing them is the orchestrator's fallthrough.
    pub fn matches(&self, filename: &str) -> bool {
        self.selector.as_ref().is_some_and(|s| s.matches(filename))
    }

    /// Files currently selected into this stream.
    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    /// How many times this stream's chain has executed.
    pub fn run_count(&self) -> u64 {
        self.runs
    }

    /// Apply a diff if the file matches (or `force` routes it here anyway).
    /// Change and remove diffs purge the cache entry for that filename along
    /// the whole chain. Returns whether the diff was taken.
    pub(crate) fn apply_diff(&mut self, diff: &FileDiff, force: bool, arena: &mut StageArena) -> bool {
        if !force && !self.matches(&diff.filename) {
            return false;
        }
        self.files.update(diff);
        if matches!(diff.command, DiffCommand::Change | DiffCommand::Remove) {
            arena.purge(self.terminal, &diff.filename);
        }
        true
    }

    /// Whether this pass should skip the chain (dormant and already run).
    pub(crate) fn should_skip(&self) -> bool {
        self.dormant && self.runs > 0
    }

    /// Execute the chain over the current selection snapshot.
    pub(crate) fn run(
        &mut self,
        arena: &mut StageArena,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        let output = arena.run_chain(self.terminal, self.files.values(), ctx)?;
        self.runs += 1;
        Ok(output)
    }
}
