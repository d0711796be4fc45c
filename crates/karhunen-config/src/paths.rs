//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/karhunen/karhunen.toml`
//! - macOS: `~/Library/Application Support/karhunen/karhunen.toml`
//! - Windows: `%APPDATA%\karhunen\karhunen.toml`

use std::path::PathBuf;

const APP_NAME: &str = "karhunen";
const CONFIG_FILE: &str = "karhunen.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform directory cannot be
/// determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path of the user settings file.
pub fn user_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}
