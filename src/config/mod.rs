//! Configuration module
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables and command-line flags.

mod settings;

pub use settings::{AppConfig, ConfigError, ConfigOverrides, LoggingSettings, SerialSettings};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "loralog", "Loralog").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}
