//! Crate-wide error types.

use crate::transform::TransformError;
use thiserror::Error;

/// Errors surfaced by the pipeline engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is unusable (e.g. source and output roots coincide).
    #[error("configuration error: {0}")]
    Config(String),

    /// A stream was defined with an invalid selection pattern.
    #[error("invalid selection pattern '{pattern}': {source}")]
    Selection {
        /// The offending pattern text
        pattern: String,
        /// The underlying glob error
        source: glob::PatternError,
    },

    /// A diff carried a command string the registry does not understand.
    #[error("unsupported diff command '{0}'")]
    UnsupportedDiffCommand(String),

    /// A transform stage failed while a stream was running.
    #[error("transform failed in stream '{stream}': {source}")]
    Transform {
        /// Tag of the stream whose chain was executing
        stream: String,
        /// The stage failure
        source: TransformError,
    },

    /// Structural mutation was attempted after the first build froze streams.
    #[error("pipeline is frozen; streams cannot be added after the first build")]
    Frozen,

    /// Filesystem error outside of any transform stage.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
