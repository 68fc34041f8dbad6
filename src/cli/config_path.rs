//! Config file resolution
//!
//! Priority:
//! 1. `--config <file>` flag (must exist)
//! 2. `$MEDALLION_CONFIG` (must exist)
//! 3. `./medallion.toml` if present
//! 4. none: built-in defaults plus environment

use std::path::{Path, PathBuf};

use crate::cli::{Error, Result};
use crate::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};

/// Resolve the config file for this process
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    resolve_config_path_with(
        explicit,
        std::env::var(CONFIG_PATH_ENV).ok(),
        Path::new("."),
    )
}

/// Same as [`resolve_config_path`] with the environment and cwd supplied
pub fn resolve_config_path_with(
    explicit: Option<&Path>,
    env_value: Option<String>,
    cwd: &Path,
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(Error::InvalidArgs(format!(
                "config file '{}' does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        let path = PathBuf::from(value.trim());
        if !path.is_file() {
            return Err(Error::InvalidArgs(format!(
                "${} points at '{}', which does not exist",
                CONFIG_PATH_ENV,
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let local = cwd.join(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    Ok(None)
}
