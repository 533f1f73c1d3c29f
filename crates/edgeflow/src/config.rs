//! Service configuration (TOML)

use crate::error::ConfigError;
use edgeflow_ingest::EngineConfig;
use edgeflow_logging::edgeflow_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the Edgeflow service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root under which every stream folder is bound
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Root of the directory record store
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Alert types; each gets `<data_root>/alerts/<type>`
    #[serde(default = "default_alert_types")]
    pub alert_types: Vec<String>,

    /// Engine timings and archive layout
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_data_root() -> PathBuf {
    edgeflow_home().join("data")
}

fn default_store_dir() -> PathBuf {
    edgeflow_home().join("records")
}

fn default_alert_types() -> Vec<String> {
    ["intrusion", "loitering", "fall", "fire"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            store_dir: default_store_dir(),
            alert_types: default_alert_types(),
            engine: EngineConfig::default(),
        }
    }
}

/// `<edgeflow_home>/config.toml`
pub fn default_config_path() -> PathBuf {
    edgeflow_home().join("config.toml")
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Load `path` if given, else the default location if it exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = default_config_path();
                if default_path.is_file() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for alert_type in &self.alert_types {
            let valid = !alert_type.is_empty()
                && alert_type
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(ConfigError::Invalid(format!(
                    "alert type '{}' must be non-empty and use only [A-Za-z0-9_-]",
                    alert_type
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = self.alert_types.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ConfigError::Invalid(format!("alert type '{}' listed twice", dup)));
        }
        Ok(())
    }
}
