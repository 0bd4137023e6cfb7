//! Path utilities for dotlog data and configuration

use std::path::PathBuf;

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "dotlog.toml";

/// Get the default data directory (./data)
pub fn default_data_dir() -> PathBuf {
    std::env::current_dir()
        .map(|dir| dir.join("data"))
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Get the per-user config file path (e.g. ~/.config/dotlog/config.toml)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dotlog").join("config.toml"))
}

/// Find the config file to load when none was given explicitly.
///
/// Prefers ./dotlog.toml, then the per-user config file. Returns None when
/// neither exists.
pub fn discover_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    user_config_path().filter(|path| path.is_file())
}
