//! Source loading stage.

use crate::file::FileRecord;
use crate::transform::{Transform, TransformContext, TransformError};

/// Loads file content from the source root.
///
/// Records that already carry content pass through untouched, so an upstream
/// stage (or a test fixture) can pre-populate them. Text vs binary is decided
/// by the workspace extension list.
#[derive(Debug, Default)]
pub struct ReadTransform;

impl ReadTransform {
    /// Create a read stage.
    pub fn new() -> Self {
        Self
    }
}

impl Transform for ReadTransform {
    fn transform(
        &self,
        mut file: FileRecord,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        if file.content.is_none() {
            file.content = Some(ctx.workspace().read(&file.filename)?);
        }
        Ok(vec![file])
    }

    fn name(&self) -> &str {
        "read"
    }
}
