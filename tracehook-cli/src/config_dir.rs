//! Base directory discovery for the agent document
//!
//! Resolution order:
//! 1. `--config-dir` flag
//! 2. `TRACEHOOK_CONFIG_DIR` environment variable (handled by clap)
//! 3. Platform config directory:
//!    - Linux: `~/.config/tracehook/`
//!    - macOS: `~/Library/Application Support/tracehook/`
//!    - Windows: `%APPDATA%\tracehook\`
//!
//! A directory that does not exist is not an error: the loader treats it as
//! "no document", which means instrumentation off.

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_DIR_ENV: &str = "TRACEHOOK_CONFIG_DIR";

/// Resolve the directory holding the agent document.
pub fn resolve(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        debug!("Using config directory override: {}", dir.display());
        return Ok(dir.to_path_buf());
    }

    let dir = platform_config_dir()?;
    debug!("Using platform config directory: {}", dir.display());
    Ok(dir)
}

fn platform_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "tracehook")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
