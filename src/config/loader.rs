//! Configuration loading and discovery for `sluice.toml`

use super::schema::SluiceConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse sluice.toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Find `sluice.toml` by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find `sluice.toml` by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join("sluice.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// With an explicit path, loads that file. Otherwise searches via
/// [`find_config`]; when nothing is found the defaults apply. The config's
/// `cwd` defaults to the directory containing the file it was loaded from.
pub fn load_config(path: Option<&Path>) -> Result<SluiceConfig, ConfigError> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match path {
        Some(path) => {
            let text = fs::read_to_string(&path)?;
            let mut config: SluiceConfig = toml::from_str(&text)?;
            if config.cwd == PathBuf::from(".") {
                if let Some(dir) = path.parent() {
                    config.cwd = dir.to_path_buf();
                }
            }
            Ok(config)
        }
        None => Ok(SluiceConfig::default()),
    }
}
