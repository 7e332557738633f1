// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated contents.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// anything that is going to be executed.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), tasks = config.task.len(), "config file parsed");

    Ok(config)
}

/// Load a configuration file and run file-level validation:
///
/// - at least one task,
/// - `threads >= 1`,
/// - every `after` entry names a known task (and not the task itself),
/// - `default`, when set, names a runnable task.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Gatedag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Gatedag.toml")
}
