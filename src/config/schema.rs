//! Configuration schema types for `sluice.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SluiceConfig {
    /// Workspace root; relative paths resolve against it
    #[serde(default = "default_cwd")]
    pub cwd: PathBuf,
    /// Source subpath under `cwd`
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Output subpath under `cwd`
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Extra file extensions treated as binary (without dots)
    #[serde(default)]
    pub binary_resource: Vec<String>,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for SluiceConfig {
    fn default() -> Self {
        Self {
            cwd: default_cwd(),
            src: default_src(),
            output: default_output(),
            binary_resource: Vec::new(),
            watch: WatchConfig::default(),
        }
    }
}

fn default_cwd() -> PathBuf {
    PathBuf::from(".")
}

fn default_src() -> PathBuf {
    PathBuf::from(".")
}

fn default_output() -> PathBuf {
    PathBuf::from("output")
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window before a change batch triggers a pass
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Additional ignore globs, relative to the source root
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Clear the terminal before each pass
    #[serde(default)]
    pub clear_screen: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), ignore: Vec::new(), clear_screen: false }
    }
}

fn default_debounce_ms() -> u32 {
    100
}

/// Default configuration, used when no `sluice.toml` is found.
pub fn default_config() -> SluiceConfig {
    SluiceConfig::default()
}
