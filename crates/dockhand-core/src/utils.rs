//! Shared path helpers for dockhand crates

use anyhow::anyhow;
use std::path::PathBuf;

/// Application directory name used under the platform data/config dirs
pub const APP_DIR: &str = "dockhand";

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// service managers running us with an overridden HOME stay consistent.
pub fn get_home_dir() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Directory holding dockhand's persistent data (state snapshot, backups)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| get_home_dir().ok().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join(APP_DIR)
}

/// Directory searched for `dockhand.yaml` after the working directory
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}
