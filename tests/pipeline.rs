//! Integration tests for the full build pipeline.
//!
//! Covers end-to-end behavior through the public API:
//!
//! - Full builds over a source tree and output placement
//! - Dependency cascades: changing a file reprocesses its dependents
//! - Per-stage cache reuse across incremental passes
//! - Diff routing between patterned and catch-all streams
//! - Removal: selection, caches, and dependency edges all let go
//! - Pass failure and recovery on the next pass

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sluice::config::{default_config, SluiceConfig};
use sluice::error::Error;
use sluice::file::{DiffCommand, FileDiff, FileRecord};
use sluice::orchestrator::{Orchestrator, PassObserver};
use sluice::transform::{Transform, TransformContext, TransformError};
use sluice::transforms::{ReadTransform, WriteTransform};
use tempfile::TempDir;

// ============================================================================
// Test transforms
// ============================================================================

/// Pass-through stage that counts how many files it actually processed.
struct Tally {
    calls: AtomicUsize,
}

impl Tally {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transform for Tally {
    fn transform(
        &self,
        file: FileRecord,
        _ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![file])
    }

    fn name(&self) -> &str {
        "tally"
    }
}

/// Counts invocations and reports a dependency for every `uses:<file>` line
/// in the content.
struct DepScan {
    calls: AtomicUsize,
}

impl DepScan {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transform for DepScan {
    fn transform(
        &self,
        file: FileRecord,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(text) = file.content.as_ref().and_then(|c| c.as_text()) {
            let deps: Vec<&str> = text.lines().filter_map(|l| l.strip_prefix("uses:")).collect();
            ctx.report_dependency(&file.filename, deps);
        }
        Ok(vec![file])
    }

    fn name(&self) -> &str {
        "dep-scan"
    }
}

/// Fails on any file whose content contains `boom`.
struct Flaky;

impl Transform for Flaky {
    fn transform(
        &self,
        file: FileRecord,
        _ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        if let Some(text) = file.content.as_ref().and_then(|c| c.as_text()) {
            if text.contains("boom") {
                return Err(TransformError::msg(format!("{} exploded", file.filename)));
            }
        }
        Ok(vec![file])
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Batch stage: concatenates the whole set into one `bundle.js`.
struct Bundle;

impl Transform for Bundle {
    fn transform(
        &self,
        _file: FileRecord,
        _ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        unreachable!("batch stages go through transform_all")
    }

    fn transform_all(
        &self,
        files: Vec<FileRecord>,
        _ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        let joined: String =
            files.iter().filter_map(|f| f.content.as_ref().and_then(|c| c.as_text())).collect();
        Ok(vec![FileRecord::with_content("bundle.js", joined)])
    }

    fn is_batch(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "bundle"
    }
}

/// Pass-through stage excluded from caching.
struct Uncached {
    calls: AtomicUsize,
}

impl Uncached {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }
}

impl Transform for Uncached {
    fn transform(
        &self,
        file: FileRecord,
        _ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![file])
    }

    fn is_cacheable(&self) -> bool {
        false
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn config_in(temp: &TempDir) -> SluiceConfig {
    let mut config = default_config();
    config.cwd = temp.path().to_path_buf();
    config
}

fn add(filename: &str, content: &str) -> FileDiff {
    FileDiff::add_with_content(filename, content)
}

fn change(filename: &str) -> FileDiff {
    FileDiff::new(filename, DiffCommand::Change)
}

fn names(records: &[FileRecord]) -> Vec<&str> {
    records.iter().map(|r| r.filename.as_str()).collect()
}

// ============================================================================
// Full builds
// ============================================================================

#[test]
fn test_build_copies_source_tree_to_output() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.txt"), "alpha").unwrap();
    std::fs::create_dir_all(temp.path().join("sub")).unwrap();
    std::fs::write(temp.path().join("sub/b.txt"), "beta").unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let def = orch.rest().pipe(Arc::new(ReadTransform::new())).pipe(Arc::new(WriteTransform::new()));
    orch.register(def, "copy").unwrap();

    let summary = orch.build().unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.file_count(), 2);
    assert_eq!(std::fs::read_to_string(temp.path().join("output/a.txt")).unwrap(), "alpha");
    assert_eq!(std::fs::read_to_string(temp.path().join("output/sub/b.txt")).unwrap(), "beta");
}

#[test]
fn test_rebuild_excludes_output_subtree() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.txt"), "alpha").unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let def = orch.rest().pipe(Arc::new(ReadTransform::new())).pipe(Arc::new(WriteTransform::new()));
    orch.register(def, "copy").unwrap();

    orch.build().unwrap();
    // The output copy written by the first build must not become a source
    // file for the second.
    let summary = orch.build().unwrap();
    assert_eq!(summary.file_count(), 1);
    assert_eq!(names(summary.output_of("copy").unwrap()), vec!["a.txt"]);
}

#[test]
fn test_build_handles_glob_metacharacters_in_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("assets [v2]");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("a.txt"), "alpha").unwrap();

    let mut config = default_config();
    config.cwd = root;
    let mut orch = Orchestrator::new(config);
    let def = orch.rest().pipe(Arc::new(ReadTransform::new()));
    orch.register(def, "all").unwrap();

    let summary = orch.build().unwrap();
    assert_eq!(names(summary.output_of("all").unwrap()), vec!["a.txt"]);
}

#[test]
fn test_build_rejects_coinciding_roots() {
    let temp = TempDir::new().unwrap();
    let mut config = config_in(&temp);
    config.output = std::path::PathBuf::from(".");

    let mut orch = Orchestrator::new(config);
    let def = orch.rest();
    orch.register(def, "copy").unwrap();

    assert!(matches!(orch.build(), Err(Error::Config(_))));
}

#[test]
fn test_register_after_build_is_frozen() {
    let temp = TempDir::new().unwrap();
    let mut orch = Orchestrator::new(config_in(&temp));
    let def = orch.rest();
    orch.register(def, "copy").unwrap();
    orch.build().unwrap();

    let late = orch.rest();
    assert!(matches!(orch.register(late, "late"), Err(Error::Frozen)));
}

// ============================================================================
// Dependency cascades
// ============================================================================

#[test]
fn test_change_reprocesses_transitive_dependents() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.html"), "uses:a.js").unwrap();
    std::fs::write(temp.path().join("a.js"), "uses:b.js").unwrap();
    std::fs::write(temp.path().join("b.js"), "b1").unwrap();
    std::fs::write(temp.path().join("c.css"), "c").unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let scan = DepScan::new();
    let def = orch.rest().pipe(Arc::new(ReadTransform::new())).pipe(scan.clone());
    orch.register(def, "all").unwrap();

    orch.build().unwrap();
    assert_eq!(scan.calls(), 4);

    let mut dependents = orch.dependents_of("b.js");
    dependents.sort();
    assert_eq!(dependents, vec!["a.html".to_string(), "a.js".to_string()]);

    // Change b.js on disk: the pass must reload b.js and both dependents,
    // while c.css stays cached.
    std::fs::write(temp.path().join("b.js"), "b2").unwrap();
    let summary = orch.on_file_event(change("b.js"));

    assert!(summary.is_success());
    assert_eq!(scan.calls(), 7);
    let output = summary.output_of("all").unwrap();
    let b = output.iter().find(|r| r.filename == "b.js").unwrap();
    assert_eq!(b.content.as_ref().unwrap().as_text(), Some("b2"));
}

#[test]
fn test_remove_clears_edges_and_selection() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.html"), "uses:a.js").unwrap();
    std::fs::write(temp.path().join("a.js"), "uses:b.js").unwrap();
    std::fs::write(temp.path().join("b.js"), "b").unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let scan = DepScan::new();
    let def = orch.rest().pipe(Arc::new(ReadTransform::new())).pipe(scan.clone());
    orch.register(def, "all").unwrap();
    orch.build().unwrap();
    assert!(orch.has_dependencies("a.js"));

    std::fs::remove_file(temp.path().join("a.js")).unwrap();
    let summary = orch.on_file_event(FileDiff::new("a.js", DiffCommand::Remove));

    assert!(summary.is_success());
    let mut remaining = names(summary.output_of("all").unwrap());
    remaining.sort();
    assert_eq!(remaining, vec!["a.html", "b.js"]);

    // The removed file's outgoing edges are gone, so b.js no longer cascades
    // anywhere.
    assert!(!orch.has_dependencies("a.js"));
    assert!(orch.dependents_of("b.js").is_empty());
    assert!(!orch.is_known("a.js"));
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn test_unchanged_files_reuse_cached_output() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.js"), "a").unwrap();
    std::fs::write(temp.path().join("b.js"), "b").unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let tally = Tally::new();
    let def = orch.pick("*.js").unwrap().pipe(Arc::new(ReadTransform::new())).pipe(tally.clone());
    orch.register(def, "js").unwrap();

    orch.build().unwrap();
    assert_eq!(tally.calls(), 2);

    std::fs::write(temp.path().join("a.js"), "a2").unwrap();
    let summary = orch.on_file_event(change("a.js"));

    // Only a.js was reprocessed; b.js came from cache but still shows up in
    // the pass output.
    assert_eq!(tally.calls(), 3);
    let mut output = names(summary.output_of("js").unwrap());
    output.sort();
    assert_eq!(output, vec!["a.js", "b.js"]);
}

#[test]
fn test_non_cacheable_stage_runs_every_pass() {
    let mut orch = Orchestrator::new(default_config());
    let uncached = Uncached::new();
    let def = orch.rest().pipe(uncached.clone());
    orch.register(def, "all").unwrap();

    orch.on_file_events(vec![add("a.txt", "a")]);
    orch.on_file_events(vec![add("b.txt", "b")]);

    // Both passes processed every selected file.
    assert_eq!(uncached.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_batch_stage_rebundles_on_change() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.js"), "a").unwrap();
    std::fs::write(temp.path().join("b.js"), "b").unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let def = orch.pick("*.js").unwrap().pipe(Arc::new(ReadTransform::new())).pipe(Arc::new(Bundle));
    orch.register(def, "js").unwrap();

    let summary = orch.build().unwrap();
    let bundle = &summary.output_of("js").unwrap()[0];
    assert_eq!(bundle.filename, "bundle.js");
    assert_eq!(bundle.content.as_ref().unwrap().as_text(), Some("ab"));

    std::fs::write(temp.path().join("a.js"), "A").unwrap();
    let summary = orch.on_file_event(change("a.js"));
    let bundle = &summary.output_of("js").unwrap()[0];
    assert_eq!(bundle.content.as_ref().unwrap().as_text(), Some("Ab"));
}

#[test]
fn test_build_of_empty_tree_still_executes_streams() {
    let temp = TempDir::new().unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let def = orch.pick("*.js").unwrap().pipe(Arc::new(Bundle));
    orch.register(def, "js").unwrap();

    // No source files at all: the pass still runs and the batch stage still
    // emits its bundle from the empty set.
    let summary = orch.build().unwrap();
    assert_eq!(summary.pass, 1);
    let bundle = summary.output_of("js").unwrap();
    assert_eq!(names(bundle), vec!["bundle.js"]);
    assert_eq!(bundle[0].content.as_ref().unwrap().as_text(), Some(""));
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_patterned_and_catch_all_routing() {
    let mut orch = Orchestrator::new(default_config());
    let js = orch.pick("*.js").unwrap();
    orch.register(js, "js").unwrap();
    let a_files = orch.pick("a.*").unwrap();
    orch.register(a_files, "a-files").unwrap();
    let rest = orch.rest();
    orch.register(rest, "rest").unwrap();

    let summary = orch.on_file_events(vec![
        add("a.js", "a"),
        add("b.js", "b"),
        add("style.css", "c"),
    ]);

    let mut js = names(summary.output_of("js").unwrap());
    js.sort();
    assert_eq!(js, vec!["a.js", "b.js"]);
    // A file matching several patterned streams reaches all of them, and
    // never falls through to the catch-all.
    assert_eq!(names(summary.output_of("a-files").unwrap()), vec!["a.js"]);
    assert_eq!(names(summary.output_of("rest").unwrap()), vec!["style.css"]);
}

#[test]
fn test_multiple_catch_alls_share_unmatched_files() {
    let mut orch = Orchestrator::new(default_config());
    let first = orch.rest();
    orch.register(first, "first").unwrap();
    let second = orch.rest();
    orch.register(second, "second").unwrap();

    let summary = orch.on_file_events(vec![add("notes.md", "n")]);
    assert_eq!(names(summary.output_of("first").unwrap()), vec!["notes.md"]);
    assert_eq!(names(summary.output_of("second").unwrap()), vec!["notes.md"]);
}

#[test]
fn test_dormant_stream_runs_once() {
    let mut orch = Orchestrator::new(default_config());
    let tally = Tally::new();
    let vendor = orch.pick("vendor/**").unwrap().pipe(tally.clone()).dormant();
    orch.register(vendor, "vendor").unwrap();
    let rest = orch.rest();
    orch.register(rest, "rest").unwrap();

    let first = orch.on_file_events(vec![add("vendor/lib.js", "l"), add("app.js", "a")]);
    assert_eq!(names(first.output_of("vendor").unwrap()), vec!["vendor/lib.js"]);
    assert_eq!(tally.calls(), 1);

    let second = orch.on_file_events(vec![add("index.html", "i")]);
    // Skipped streams produce no output for the pass and do not re-execute.
    assert!(second.output_of("vendor").is_none());
    assert_eq!(tally.calls(), 1);
}

// ============================================================================
// Failure and recovery
// ============================================================================

#[test]
fn test_failed_pass_reports_stream_and_recovers() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.txt"), "boom").unwrap();

    let mut orch = Orchestrator::new(config_in(&temp));
    let def = orch.rest().pipe(Arc::new(ReadTransform::new())).pipe(Arc::new(Flaky));
    orch.register(def, "texts").unwrap();

    let failed = orch.build().unwrap();
    assert!(!failed.is_success());
    assert_eq!(failed.file_count(), 0);
    let message = failed.error.unwrap();
    assert!(message.contains("texts"));
    assert!(message.contains("a.txt"));

    // Fixing the file and pushing a change diff recovers on the next pass.
    std::fs::write(temp.path().join("a.txt"), "fine").unwrap();
    let recovered = orch.on_file_event(change("a.txt"));
    assert!(recovered.is_success());
    assert_eq!(recovered.pass, 2);
    assert_eq!(names(recovered.output_of("texts").unwrap()), vec!["a.txt"]);
}

// ============================================================================
// Observer events
// ============================================================================

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<std::sync::Mutex<Vec<String>>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl PassObserver for Recorder {
    fn pass_started(&self, pass: u64, _streams: usize) {
        self.push(format!("pass_started:{}", pass));
    }

    fn stream_started(&self, _pass: u64, tag: &str) {
        self.push(format!("stream_started:{}", tag));
    }

    fn stream_finished(&self, _pass: u64, tag: &str, outputs: usize, _elapsed: std::time::Duration) {
        self.push(format!("stream_finished:{}:{}", tag, outputs));
    }

    fn stream_skipped(&self, _pass: u64, tag: &str) {
        self.push(format!("stream_skipped:{}", tag));
    }

    fn pass_completed(&self, pass: u64, outputs: usize, _elapsed: std::time::Duration) {
        self.push(format!("pass_completed:{}:{}", pass, outputs));
    }

    fn pass_failed(&self, pass: u64, _error: &Error) {
        self.push(format!("pass_failed:{}", pass));
    }
}

#[test]
fn test_observer_sees_pass_lifecycle() {
    let mut orch = Orchestrator::new(default_config());
    let recorder = Recorder::default();
    orch.add_observer(Box::new(recorder.clone()));
    let def = orch.rest();
    orch.register(def, "all").unwrap();

    orch.on_file_events(vec![add("a.txt", "a")]);

    assert_eq!(
        recorder.events(),
        vec![
            "pass_started:1".to_string(),
            "stream_started:all".to_string(),
            "stream_finished:all:1".to_string(),
            "pass_completed:1:1".to_string(),
        ]
    );
}

#[test]
fn test_observer_sees_failure() {
    let mut orch = Orchestrator::new(default_config());
    let recorder = Recorder::default();
    orch.add_observer(Box::new(recorder.clone()));
    let def = orch.rest().pipe(Arc::new(Flaky));
    orch.register(def, "all").unwrap();

    orch.on_file_events(vec![add("a.txt", "boom")]);

    let events = recorder.events();
    assert_eq!(events.first().unwrap(), "pass_started:1");
    assert_eq!(events.last().unwrap(), "pass_failed:1");
}
