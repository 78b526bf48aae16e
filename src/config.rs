//! Application settings.
//!
//! Settings are read from a TOML file. Every key is optional:
//!
//! ```toml
//! [cleaner]
//! max_line_bytes = 16777216
//! output_suffix = ".cleaned"
//!
//! [storage]
//! filters_file = "/home/me/logtidy-filters.json"
//!
//! [logging]
//! level = "warn"
//! ```

use crate::cleaner::{DEFAULT_MAX_LINE_BYTES, MIN_MAX_LINE_BYTES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during configuration loading.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax, structure or value.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cleaner: CleanerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Settings for a cleaning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanerSettings {
    /// Hard ceiling for a single input line, in bytes.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Appended to the input path to form the default output path.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

fn default_output_suffix() -> String {
    ".cleaned".to_string()
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
            output_suffix: default_output_suffix(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Overrides the default filter file location.
    #[serde(default)]
    pub filters_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// A `tracing` filter directive such as `warn` or `logtidy=debug`.
    #[serde(default)]
    pub level: Option<String>,
}

impl Settings {
    /// Load settings, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.logtidyrc.toml` in the current directory
    /// 3. Look for `~/.config/logtidy/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any file found is invalid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".logtidyrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("logtidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load settings from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let settings = Self::from_toml(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(settings)
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cleaner.max_line_bytes < MIN_MAX_LINE_BYTES {
            return Err(ConfigError::ConfigInvalid(format!(
                "cleaner.max_line_bytes must be at least {} (got {})",
                MIN_MAX_LINE_BYTES, self.cleaner.max_line_bytes
            )));
        }
        if self.cleaner.output_suffix.is_empty() {
            return Err(ConfigError::ConfigInvalid(
                "cleaner.output_suffix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Default output path for `input`: the input path plus the suffix.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let mut os = input.as_os_str().to_owned();
        os.push(&self.cleaner.output_suffix);
        PathBuf::from(os)
    }
}
