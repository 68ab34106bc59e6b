//! File records and change diffs.
//!
//! A [`FileRecord`] is the unit that flows through transform chains. Its
//! content is optional: `None` means the file is known but not loaded (or has
//! been invalidated by a change diff and must be reloaded).

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Content of a source or generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// UTF-8 text content
    Text(String),
    /// Raw binary content
    Binary(Vec<u8>),
}

impl FileContent {
    /// Content as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(s) => Some(s),
            FileContent::Binary(_) => None,
        }
    }

    /// Content as raw bytes regardless of kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(s) => s.as_bytes(),
            FileContent::Binary(b) => b,
        }
    }

    /// Byte length of the content.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the content is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        FileContent::Text(s.to_string())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        FileContent::Text(s)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(b: Vec<u8>) -> Self {
        FileContent::Binary(b)
    }
}

/// A file flowing through the pipeline.
///
/// Filenames are root-relative with forward-slash separators. Records are
/// copied, not shared, when they cross stream boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Root-relative, separator-normalized filename
    pub filename: String,
    /// File content; `None` means not yet loaded or stale
    pub content: Option<FileContent>,
}

impl FileRecord {
    /// Create a record with no content.
    pub fn new(filename: impl Into<String>) -> Self {
        Self { filename: filename.into(), content: None }
    }

    /// Create a record with content.
    pub fn with_content(filename: impl Into<String>, content: impl Into<FileContent>) -> Self {
        Self { filename: filename.into(), content: Some(content.into()) }
    }

    /// Replace the content, returning the updated record.
    pub fn update(mut self, content: impl Into<FileContent>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Whether the record has loaded content.
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }
}

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffCommand {
    /// File appeared (or is part of the initial inventory)
    Add,
    /// File content changed; the file stays selected but must be reloaded
    Change,
    /// File disappeared
    Remove,
}

impl fmt::Display for DiffCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffCommand::Add => write!(f, "add"),
            DiffCommand::Change => write!(f, "change"),
            DiffCommand::Remove => write!(f, "remove"),
        }
    }
}

impl FromStr for DiffCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(DiffCommand::Add),
            "change" => Ok(DiffCommand::Change),
            "remove" => Ok(DiffCommand::Remove),
            other => Err(Error::UnsupportedDiffCommand(other.to_string())),
        }
    }
}

/// A single file-change event.
///
/// Produced by the watcher or synthesized internally when a dependency
/// cascades into a change. Transient: consumed once per orchestration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Root-relative filename
    pub filename: String,
    /// What happened
    pub command: DiffCommand,
    /// Optional content carried with an add diff
    pub content: Option<FileContent>,
}

impl FileDiff {
    /// Create a diff with no content.
    pub fn new(filename: impl Into<String>, command: DiffCommand) -> Self {
        Self { filename: filename.into(), command, content: None }
    }

    /// Create an add diff carrying content.
    pub fn add_with_content(
        filename: impl Into<String>,
        content: impl Into<FileContent>,
    ) -> Self {
        Self { filename: filename.into(), command: DiffCommand::Add, content: Some(content.into()) }
    }

    /// Parse a diff from a raw command string, as received from external
    /// event sources. Unknown commands fail with
    /// [`Error::UnsupportedDiffCommand`].
    pub fn parse(filename: impl Into<String>, command: &str) -> Result<Self, Error> {
        Ok(Self::new(filename, command.parse()?))
    }
}
