//! Output writing stage.

use crate::file::FileRecord;
use crate::transform::{Transform, TransformContext, TransformError};

/// Writes each record under the output root, creating parent directories.
///
/// Records without content are skipped (nothing to write). Not cacheable:
/// writing is a side effect and must happen on every run that reaches it.
#[derive(Debug, Default)]
pub struct WriteTransform;

impl WriteTransform {
    /// Create a write stage.
    pub fn new() -> Self {
        Self
    }
}

impl Transform for WriteTransform {
    fn transform(
        &self,
        file: FileRecord,
        ctx: &TransformContext,
    ) -> Result<Vec<FileRecord>, TransformError> {
        if let Some(content) = &file.content {
            ctx.workspace().write(&file.filename, content)?;
        }
        Ok(vec![file])
    }

    fn is_cacheable(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "write"
    }
}
