//! Transform stage contract.
//!
//! A transform turns one file (or the whole current file set) into zero or
//! more output files. Plugins implement [`Transform`] and are composed into
//! stream chains; the engine decides per stage whether cached output can be
//! reused.

use std::sync::Mutex;

use thiserror::Error;

use crate::file::FileRecord;
use crate::fsutil::Workspace;

/// Failure inside a transform stage. Aborts the owning stream's current run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransformError {
    /// Plugin-reported failure
    #[error("{0}")]
    Message(String),
    /// Filesystem error while reading or writing a file
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Convenience constructor for plugin failures.
    pub fn msg(message: impl Into<String>) -> Self {
        TransformError::Message(message.into())
    }
}

/// Shared services available to a transform while a pass executes.
///
/// Carries workspace file access and a sink for cross-file dependency
/// reports. The sink is thread-safe because per-file transforms within one
/// stage may run concurrently; the orchestrator drains it into the
/// dependency map once the pass settles.
pub struct TransformContext {
    workspace: Workspace,
    reported: Mutex<Vec<(String, Vec<String>)>>,
}

impl TransformContext {
    /// Create a context for one pass.
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace, reported: Mutex::new(Vec::new()) }
    }

    /// Workspace file access.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Report that `filename` depends on each of `dependencies`.
    ///
    /// No-op when either side is empty.
    pub fn report_dependency<S: Into<String>>(
        &self,
        filename: &str,
        dependencies: impl IntoIterator<Item = S>,
    ) {
        let deps: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        if filename.is_empty() || deps.is_empty() {
            return;
        }
        if let Ok(mut reported) = self.reported.lock() {
            reported.push((filename.to_string(), deps));
        }
    }

    /// Take all dependency reports accumulated so far.
    pub fn take_reported(&self) -> Vec<(String, Vec<String>)> {
        match self.reported.lock() {
            Ok(mut reported) => std::mem::take(&mut *reported),
            Err(_) => Vec::new(),
        }
    }
}

/// One transformation unit.
///
/// Implementations are shared across threads during a pass, so they must be
/// `Send + Sync` and keep any internal state behind synchronization.
pub trait Transform: Send + Sync {
    /// Transform a single file into zero or more output files.
    fn transform(
        &self,
        file: FileRecord,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError>;

    /// Transform the entire current file set at once. Only called for
    /// batch-mode stages; the default maps [`Transform::transform`] over the
    /// set.
    fn transform_all(
        &self,
        files: Vec<FileRecord>,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            out.extend(self.transform(file, ctx)?);
        }
        Ok(out)
    }

    /// Batch-mode ("torrential") stages consume the whole file set in one
    /// call; output identities need not match input identities.
    fn is_batch(&self) -> bool {
        false
    }

    /// Non-cacheable stages are re-executed even for unchanged files.
    fn is_cacheable(&self) -> bool {
        true
    }

    /// Short name used in logs.
    fn name(&self) -> &str {
        "transform"
    }
}
