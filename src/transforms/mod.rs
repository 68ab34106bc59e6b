//! Built-in transform plugins and the plugin registry.

mod read;
mod registry;
mod write;

pub use read::ReadTransform;
pub use registry::TransformRegistry;
pub use write::WriteTransform;
