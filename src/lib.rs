//! Sluice - incremental asset build pipeline
//!
//! This library provides functionality to:
//! - Define streams of files selected by glob patterns and piped through
//!   transform chains
//! - Run full builds and incremental passes that reprocess only changed
//!   files and their transitive dependents
//! - Cache per-file transform output and reuse it across passes
//! - Watch a source directory and rebuild automatically on changes

pub mod cli;
pub mod config;
pub mod error;
pub mod file;
pub mod fsutil;
pub mod graph;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod stream;
pub mod transform;
pub mod transforms;
pub mod watch;

pub use error::Error;
