//! Application settings

use crate::core::connection::{default_port, ConnectionConfig, DEFAULT_BAUD_RATE};
use crate::core::line::DEFAULT_MAX_LINE_BYTES;
use crate::core::logger::DEFAULT_PREFIX;
use crate::core::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link settings
    pub serial: SerialSettings,
    /// Log file settings
    pub logging: LoggingSettings,
}

/// `[serial]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: 1000,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directory log files are created in
    pub directory: PathBuf,
    /// Log file name prefix
    pub prefix: String,
    /// Sync to disk after every record
    pub sync: bool,
    /// Cap on an unterminated line
    pub max_line_bytes: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: DEFAULT_PREFIX.to_string(),
            sync: true,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Values from flags or environment that win over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Port name
    pub port: Option<String>,
    /// Baud rate
    pub baud_rate: Option<u32>,
    /// Read timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Log directory
    pub directory: Option<PathBuf>,
    /// Log file prefix
    pub prefix: Option<String>,
    /// Disable per-record sync
    pub no_sync: bool,
}

impl AppConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load config from a file
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load from an explicit path, else the default location if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        match super::default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::load_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply flag and environment values
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(port) = overrides.port {
            self.serial.port = port;
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.serial.baud_rate = baud_rate;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.serial.timeout_ms = timeout_ms;
        }
        if let Some(directory) = overrides.directory {
            self.logging.directory = directory;
        }
        if let Some(prefix) = overrides.prefix {
            self.logging.prefix = prefix;
        }
        if overrides.no_sync {
            self.logging.sync = false;
        }
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::Invalid("serial port must not be empty".into()));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud rate must be greater than zero".into()));
        }
        if self.serial.timeout_ms == 0 {
            return Err(ConfigError::Invalid("read timeout must be greater than zero".into()));
        }
        if self.logging.prefix.is_empty() || self.logging.prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "log prefix {:?} is not a plain file name",
                self.logging.prefix
            )));
        }
        if self.logging.max_line_bytes == 0 {
            return Err(ConfigError::Invalid("max_line_bytes must be greater than zero".into()));
        }
        Ok(())
    }

    /// Validated session configuration
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        self.validate()?;

        Ok(SessionConfig {
            connection: ConnectionConfig::new(&self.serial.port, self.serial.baud_rate)
                .timeout(Duration::from_millis(self.serial.timeout_ms)),
            log_dir: self.logging.directory.clone(),
            log_prefix: self.logging.prefix.clone(),
            sync: self.logging.sync,
            max_line_bytes: self.logging.max_line_bytes,
        })
    }
}
