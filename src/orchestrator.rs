//! Pass orchestration.
//!
//! The orchestrator owns the streams, the stage arena, and the dependency
//! map. It converts raw file-change diffs into per-stream invalidations,
//! expands the changed set through the dependency graph, and executes every
//! registered stream in registration order, aggregating the results into a
//! [`PassSummary`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::SluiceConfig;
use crate::error::Error;
use crate::file::{DiffCommand, FileDiff, FileRecord};
use crate::fsutil::Workspace;
use crate::graph::DependencyMap;
use crate::stream::{Selector, StageArena, Stream, StreamDef};
use crate::transform::TransformContext;

/// Lifecycle notifications for one orchestration pass.
///
/// Every callback carries the pass identifier so log and metrics consumers
/// can correlate sequential passes.
pub trait PassObserver: Send {
    /// A pass began, covering `streams` registered streams.
    fn pass_started(&self, _pass: u64, _streams: usize) {}
    /// A stream's chain is about to execute.
    fn stream_started(&self, _pass: u64, _tag: &str) {}
    /// A stream's chain finished.
    fn stream_finished(&self, _pass: u64, _tag: &str, _outputs: usize, _elapsed: Duration) {}
    /// A dormant stream was skipped because it already ran.
    fn stream_skipped(&self, _pass: u64, _tag: &str) {}
    /// The pass finished successfully.
    fn pass_completed(&self, _pass: u64, _outputs: usize, _elapsed: Duration) {}
    /// The pass aborted on a stage failure.
    fn pass_failed(&self, _pass: u64, _error: &Error) {}
}

/// Output of one stream within a pass.
#[derive(Debug, Clone)]
pub struct StreamOutput {
    /// Stream tag
    pub tag: String,
    /// Flattened output records of the stream's chain
    pub files: Vec<FileRecord>,
}

/// Aggregated result of one orchestration pass.
#[derive(Debug, Clone)]
pub struct PassSummary {
    /// Monotonically increasing pass identifier
    pub pass: u64,
    /// Per-stream outputs, in registration order
    pub streams: Vec<StreamOutput>,
    /// Failure message when the pass aborted; output is empty in that case
    pub error: Option<String>,
}

impl PassSummary {
    /// Whether the pass completed without a stage failure.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Flattened view over every stream's output, in registration order.
    pub fn files(&self) -> Vec<&FileRecord> {
        self.streams.iter().flat_map(|s| s.files.iter()).collect()
    }

    /// Total number of output records across streams.
    pub fn file_count(&self) -> usize {
        self.streams.iter().map(|s| s.files.len()).sum()
    }

    /// Output of the stream registered under `tag`.
    pub fn output_of(&self, tag: &str) -> Option<&[FileRecord]> {
        self.streams.iter().find(|s| s.tag == tag).map(|s| s.files.as_slice())
    }
}

/// Owns the pipeline: streams, caches, dependency map, and pass scheduling.
pub struct Orchestrator {
    config: SluiceConfig,
    workspace: Workspace,
    graph: DependencyMap,
    arena: StageArena,
    streams: Vec<Stream>,
    observers: Vec<Box<dyn PassObserver>>,
    frozen: bool,
    passes: u64,
    pending: VecDeque<FileDiff>,
}

impl Orchestrator {
    /// Create an orchestrator for the given configuration.
    pub fn new(config: SluiceConfig) -> Self {
        let workspace = Workspace::from_config(&config);
        Self {
            config,
            workspace,
            graph: DependencyMap::new(),
            arena: StageArena::default(),
            streams: Vec::new(),
            observers: Vec::new(),
            frozen: false,
            passes: 0,
            pending: VecDeque::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SluiceConfig {
        &self.config
    }

    /// Workspace paths and file access.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Attach a lifecycle observer.
    pub fn add_observer(&mut self, observer: Box<dyn PassObserver>) {
        self.observers.push(observer);
    }

    /// Start a stream definition selecting files by a single glob pattern.
    pub fn pick(&self, pattern: &str) -> Result<StreamDef, Error> {
        Ok(StreamDef::new(Some(Selector::new([pattern])?)))
    }

    /// Start a stream definition selecting files by several glob patterns.
    pub fn pick_many<I, S>(&self, patterns: I) -> Result<StreamDef, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(StreamDef::new(Some(Selector::new(patterns)?)))
    }

    /// Start a catch-all stream definition: it receives every file unmatched
    /// by all patterned streams.
    pub fn rest(&self) -> StreamDef {
        StreamDef::new(None)
    }

    /// Register a finished definition as a terminal stream under `tag`.
    /// Fails once the first build has frozen the pipeline structure.
    pub fn register(&mut self, def: StreamDef, tag: &str) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        let terminal = self.arena.register_chain(&def.stages);
        self.streams.push(Stream::new(tag.to_string(), def.selector, terminal, def.dormant));
        Ok(())
    }

    /// Record that `filename` depends on each of `dependencies`. No-op when
    /// either side is empty.
    pub fn report_dependency<S: AsRef<str>>(
        &mut self,
        filename: &str,
        dependencies: impl IntoIterator<Item = S>,
    ) {
        let deps: Vec<String> =
            dependencies.into_iter().map(|d| d.as_ref().to_string()).collect();
        if filename.is_empty() || deps.is_empty() {
            return;
        }
        self.graph.add(filename, deps);
    }

    /// Files that depend on `filename`, directly or transitively.
    pub fn dependents_of(&self, filename: &str) -> Vec<String> {
        self.graph.resolve([filename])
    }

    /// Whether any recorded edge originates from `filename`.
    pub fn has_dependencies(&self, filename: &str) -> bool {
        self.graph.contains(filename)
    }

    /// Whether any stream currently holds `filename` in its selection.
    pub fn is_known(&self, filename: &str) -> bool {
        self.streams.iter().any(|s| s.files().has(filename))
    }

    /// Tags of all registered streams, in registration order.
    pub fn stream_tags(&self) -> Vec<&str> {
        self.streams.iter().map(Stream::tag).collect()
    }

    /// Number of passes executed so far.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// Drop all streams, caches, and dependency edges, and unfreeze the
    /// pipeline so it can be redefined.
    pub fn clear(&mut self) {
        self.streams.clear();
        self.arena.clear();
        self.graph.clear(None);
        self.pending.clear();
        self.frozen = false;
    }

    /// Full rebuild: clear the output directory, freeze the pipeline,
    /// enumerate every file under the source root (excluding the output
    /// subtree), and feed the inventory through the incremental path.
    pub fn build(&mut self) -> Result<PassSummary, Error> {
        if self.workspace.roots_coincide() {
            return Err(Error::Config(
                "source and output directories must be different".to_string(),
            ));
        }
        self.workspace.clear_output()?;
        self.frozen = true;

        let diffs = self
            .enumerate_files()?
            .into_iter()
            .map(|filename| FileDiff::new(filename, DiffCommand::Add))
            .collect();
        Ok(self.on_file_events(diffs))
    }

    /// Queue diffs without running a pass. The next [`Self::on_file_events`]
    /// call drains them together with its own batch, so diffs accumulated
    /// between passes coalesce into a single pass instead of one pass each.
    pub fn queue_file_events(&mut self, diffs: impl IntoIterator<Item = FileDiff>) {
        self.pending.extend(diffs);
    }

    /// Incremental update entry point.
    ///
    /// Drains everything queued so far plus `diffs` into exactly one pass.
    /// Passes never overlap: the orchestrator is single-threaded and a pass
    /// runs to completion before the next batch is taken. An empty batch
    /// still runs a pass, since batch stages can produce output from an
    /// empty set and observers expect the pass lifecycle regardless.
    pub fn on_file_events(&mut self, diffs: Vec<FileDiff>) -> PassSummary {
        self.frozen = true;
        self.pending.extend(diffs);
        let batch: Vec<FileDiff> = self.pending.drain(..).collect();
        self.run_pass(batch)
    }

    /// Convenience wrapper for a single diff.
    pub fn on_file_event(&mut self, diff: FileDiff) -> PassSummary {
        self.on_file_events(vec![diff])
    }

    fn enumerate_files(&self) -> Result<Vec<String>, Error> {
        // The root is a literal path, not a pattern; escape it so a
        // workspace directory named e.g. "assets [v2]" enumerates correctly.
        let root = self.workspace.src_root().display().to_string();
        let pattern = format!("{}/**/*", glob::Pattern::escape(&root));
        let entries = glob::glob(&pattern)
            .map_err(|source| Error::Selection { pattern: pattern.clone(), source })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(_) => continue,
            };
            if !path.is_file() {
                continue;
            }
            if let Some(name) = self.workspace.relative_name(&path) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn run_pass(&mut self, mut diffs: Vec<FileDiff>) -> PassSummary {
        self.passes += 1;
        let pass = self.passes;
        let start = Instant::now();
        for obs in &self.observers {
            obs.pass_started(pass, self.streams.len());
        }

        // Expand the changed set: every transitive dependent of a changed
        // file is rebuilt with "change" semantics (entry kept, content
        // invalidated).
        let changed: Vec<String> = diffs.iter().map(|d| d.filename.clone()).collect();
        for dependent in self.graph.resolve(changed.iter()) {
            if !diffs.iter().any(|d| d.filename == dependent) {
                diffs.push(FileDiff::new(dependent, DiffCommand::Change));
            }
        }

        // A removed file's outgoing edges are cleared before any stage runs,
        // so nothing resolves through it during this pass.
        for diff in &diffs {
            if diff.command == DiffCommand::Remove {
                self.graph.clear(Some(&diff.filename));
            }
        }

        // Route diffs: every matching patterned stream takes the file;
        // unmatched files fall through to every catch-all stream.
        {
            let streams = &mut self.streams;
            let arena = &mut self.arena;
            for diff in &diffs {
                let mut matched = false;
                for stream in streams.iter_mut() {
                    if stream.is_catch_all() {
                        continue;
                    }
                    if stream.apply_diff(diff, false, arena) {
                        matched = true;
                    }
                }
                if !matched {
                    for stream in streams.iter_mut() {
                        if stream.is_catch_all() {
                            stream.apply_diff(diff, true, arena);
                        }
                    }
                }
            }
        }

        // Execute all streams in registration order.
        let ctx = TransformContext::new(self.workspace.clone());
        let mut outputs: Vec<StreamOutput> = Vec::new();
        let mut failure: Option<Error> = None;

        {
            let streams = &mut self.streams;
            let arena = &mut self.arena;
            for stream in streams.iter_mut() {
                if stream.should_skip() {
                    for obs in &self.observers {
                        obs.stream_skipped(pass, stream.tag());
                    }
                    continue;
                }
                for obs in &self.observers {
                    obs.stream_started(pass, stream.tag());
                }
                let stream_start = Instant::now();
                match stream.run(arena, &ctx) {
                    Ok(files) => {
                        for obs in &self.observers {
                            obs.stream_finished(
                                pass,
                                stream.tag(),
                                files.len(),
                                stream_start.elapsed(),
                            );
                        }
                        outputs.push(StreamOutput { tag: stream.tag().to_string(), files });
                    }
                    Err(source) => {
                        failure =
                            Some(Error::Transform { stream: stream.tag().to_string(), source });
                        break;
                    }
                }
            }
        }

        // Dependencies reported by plugins during this pass feed the next
        // incremental update.
        for (filename, deps) in ctx.take_reported() {
            self.graph.add(&filename, deps);
        }

        match failure {
            Some(error) => {
                for obs in &self.observers {
                    obs.pass_failed(pass, &error);
                }
                PassSummary { pass, streams: Vec::new(), error: Some(error.to_string()) }
            }
            None => {
                let total = outputs.iter().map(|o| o.files.len()).sum();
                for obs in &self.observers {
                    obs.pass_completed(pass, total, start.elapsed());
                }
                PassSummary { pass, streams: outputs, error: None }
            }
        }
    }
}
