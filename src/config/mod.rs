//! Configuration for `sluice.toml`
//!
//! Split into schema types and loading/discovery, mirroring how the config
//! file itself is organized.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
