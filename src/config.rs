//! Configuration for the breath classifier.

use crate::inference::client::{ClientConfig, DEFAULT_SERVICE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where aggregated feature tables are written
    pub export_path: PathBuf,

    /// Base URL of the remote prediction service
    pub service_url: String,

    /// Timeout for prediction service requests (in seconds)
    pub request_timeout_secs: u64,

    /// Model artifact used by `classify` and `serve`
    pub model_path: PathBuf,

    /// Port for `serve`
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("breath-classifier");

        Self {
            export_path: data_dir.join("exports"),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: 10,
            model_path: data_dir.join("model.json"),
            server_port: 8000,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, or defaults if it does not exist.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from JSON; missing keys take defaults.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a file, creating its directory.
    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Set one setting by its JSON key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |e: &dyn std::fmt::Display| {
            ConfigError::InvalidValue(format!("{key} = {value:?}: {e}"))
        };
        match key {
            "export_path" => self.export_path = PathBuf::from(value),
            "service_url" => self.service_url = value.to_string(),
            "request_timeout_secs" => {
                self.request_timeout_secs = value.parse::<u64>().map_err(|e| invalid(&e))?
            }
            "model_path" => self.model_path = PathBuf::from(value),
            "server_port" => self.server_port = value.parse::<u16>().map_err(|e| invalid(&e))?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("breath-classifier")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Default export file for an aggregation run.
    pub fn default_export_file(&self) -> PathBuf {
        self.export_path.join("features.csv")
    }

    /// Client settings, with an optional URL override.
    pub fn client_config(&self, url_override: Option<&str>) -> ClientConfig {
        ClientConfig::new(
            url_override.unwrap_or(&self.service_url),
            Duration::from_secs(self.request_timeout_secs),
        )
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    UnknownKey(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value for {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
