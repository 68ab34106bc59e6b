//! Watch mode for automatic incremental passes on file changes.
//!
//! Debounced file system watching over the source root. Each debounced batch
//! is classified into diffs and fed through the orchestrator's incremental
//! path, so only changed files and their dependents are reprocessed.

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::file::{DiffCommand, FileDiff};
use crate::orchestrator::Orchestrator;

/// Error during watch mode.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize the file watcher
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add the watch path
    #[error("failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Watcher channel closed unexpectedly
    #[error("watch channel error: {0}")]
    Channel(String),
    /// Source directory does not exist
    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Classify a changed path into a diff, or `None` when it should be ignored.
///
/// Paths outside the source root or inside the output subtree never produce a
/// diff. A path that no longer exists is a removal; a path already tracked by
/// some stream is a change; anything else is an addition.
fn classify(orchestrator: &Orchestrator, path: &Path) -> Option<FileDiff> {
    let name = orchestrator.workspace().relative_name(path)?;
    if is_ignored(orchestrator, &name) {
        return None;
    }
    let command = if !path.exists() {
        DiffCommand::Remove
    } else if orchestrator.is_known(&name) {
        DiffCommand::Change
    } else {
        DiffCommand::Add
    };
    Some(FileDiff::new(name, command))
}

fn is_ignored(orchestrator: &Orchestrator, name: &str) -> bool {
    orchestrator
        .config()
        .watch
        .ignore
        .iter()
        .filter_map(|pattern| glob::Pattern::new(pattern).ok())
        .any(|pattern| pattern.matches(name))
}

/// Clear the terminal screen.
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Current wall-clock time for log lines.
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

/// Watch the source root and run incremental passes until interrupted.
///
/// The initial full build must have happened already; this loop only feeds
/// diffs. Pass failures are logged and watching continues.
pub fn watch_and_rebuild(orchestrator: &mut Orchestrator) -> Result<(), WatchError> {
    let src = orchestrator.workspace().src_root().to_path_buf();
    if !src.exists() {
        return Err(WatchError::SourceNotFound(src));
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(orchestrator.config().watch.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer.watcher().watch(&src, RecursiveMode::Recursive).map_err(WatchError::WatchPath)?;

    println!("[{}] Watching {} for changes...", timestamp(), src.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let diffs: Vec<FileDiff> = events
                    .iter()
                    .filter_map(|event| classify(orchestrator, &event.path))
                    .collect();
                if diffs.is_empty() {
                    continue;
                }

                if orchestrator.config().watch.clear_screen {
                    clear_screen();
                }
                for diff in &diffs {
                    println!("[{}] {}: {}", timestamp(), diff.command, diff.filename);
                }

                let summary = orchestrator.on_file_events(diffs);
                match &summary.error {
                    None => {
                        println!(
                            "[{}] Pass #{} complete: {} file{}",
                            timestamp(),
                            summary.pass,
                            summary.file_count(),
                            if summary.file_count() == 1 { "" } else { "s" }
                        );
                    }
                    Some(message) => {
                        eprintln!("[{}] Pass #{} failed: {}", timestamp(), summary.pass, message);
                    }
                }
                println!("[{}] Watching {} for changes...", timestamp(), src.display());
            }
            Ok(Err(error)) => {
                // Non-fatal watcher error, keep going.
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
            }
            Err(error) => {
                return Err(WatchError::Channel(error.to_string()));
            }
        }
    }
}
