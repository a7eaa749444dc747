//! Path resolution for adclictl
//!
//! # Environment Variables
//!
//! - `ADCLICTL_CONFIG_DIR` - Override config directory
//! - `ADCLICTL_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `ADCLICTL_CONFIG_DIR` environment variable
//! 2. `/etc/adclictl`
//!
//! For state_dir():
//! 1. `ADCLICTL_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/adclictl` (if set)
//! 3. `~/.local/state/adclictl`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "ADCLICTL_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "ADCLICTL_STATE_DIR";

/// System-wide config directory
const DEFAULT_CONFIG_DIR: &str = "/etc/adclictl";

/// Get the adclictl config directory path
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return path;
    }

    PathBuf::from(DEFAULT_CONFIG_DIR)
}

/// Default config file path
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the adclictl state directory path
///
/// Priority:
/// 1. `ADCLICTL_STATE_DIR` env var
/// 2. `XDG_STATE_HOME/adclictl`
/// 3. `~/.local/state/adclictl`
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("adclictl");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("adclictl");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables leave the string untouched.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
