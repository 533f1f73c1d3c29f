//! Engine tuning knobs

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and layout settings for an [`IngestEngine`](crate::IngestEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between scanner ticks
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Minimum mtime age (seconds) before a file is considered fully written
    #[serde(default = "default_stability_window")]
    pub stability_window_secs: u64,

    /// Seconds between janitor sweeps of the completed set
    #[serde(default = "default_janitor_interval")]
    pub janitor_interval_secs: u64,

    /// How long (seconds) a finished path stays suppressed from re-discovery
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    /// Cap on concurrently running handlers. `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_files: Option<usize>,

    /// Name of the success archive under each watched folder
    #[serde(default = "default_processed_dir_name")]
    pub processed_dir_name: String,

    /// Name of the failure archive under each watched folder
    #[serde(default = "default_failed_dir_name")]
    pub failed_dir_name: String,
}

fn default_scan_interval() -> u64 {
    5
}

fn default_stability_window() -> u64 {
    2
}

fn default_janitor_interval() -> u64 {
    30 * 60
}

fn default_retention() -> u64 {
    2 * 60 * 60
}

fn default_processed_dir_name() -> String {
    "processed".to_string()
}

fn default_failed_dir_name() -> String {
    "failed".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            stability_window_secs: default_stability_window(),
            janitor_interval_secs: default_janitor_interval(),
            retention_secs: default_retention(),
            max_concurrent_files: None,
            processed_dir_name: default_processed_dir_name(),
            failed_dir_name: default_failed_dir_name(),
        }
    }
}

impl EngineConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn stability_window(&self) -> Duration {
        Duration::from_secs(self.stability_window_secs)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Reject settings the loops cannot run with.
    ///
    /// Tokio intervals panic on a zero period, and archive directory names
    /// must be plain single components so they stay inside the watched folder.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            return Err(IngestError::Config(
                "scan_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.janitor_interval_secs == 0 {
            return Err(IngestError::Config(
                "janitor_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_files == Some(0) {
            return Err(IngestError::Config(
                "max_concurrent_files must be at least 1 when set".to_string(),
            ));
        }
        for name in [&self.processed_dir_name, &self.failed_dir_name] {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(IngestError::Config(format!(
                    "archive directory name '{}' must be a single path component",
                    name
                )));
            }
        }
        if self.processed_dir_name == self.failed_dir_name {
            return Err(IngestError::Config(
                "processed_dir_name and failed_dir_name must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.scan_interval(), Duration::from_secs(5));
        assert_eq!(config.stability_window(), Duration::from_secs(2));
        assert_eq!(config.janitor_interval(), Duration::from_secs(1800));
        assert_eq!(config.retention(), Duration::from_secs(7200));
        assert_eq!(config.max_concurrent_files, None);
        assert_eq!(config.processed_dir_name, "processed");
        assert_eq!(config.failed_dir_name, "failed");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            scan_interval_secs = 1
            max_concurrent_files = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.scan_interval_secs, 1);
        assert_eq!(config.max_concurrent_files, Some(8));
        assert_eq!(config.retention_secs, 7200);
        assert_eq!(config.failed_dir_name, "failed");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let zero_tick = EngineConfig {
            scan_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert!(zero_tick.validate().is_err());

        let nested = EngineConfig {
            processed_dir_name: "a/b".to_string(),
            ..EngineConfig::default()
        };
        assert!(nested.validate().is_err());

        let same = EngineConfig {
            failed_dir_name: "processed".to_string(),
            ..EngineConfig::default()
        };
        assert!(same.validate().is_err());

        let no_workers = EngineConfig {
            max_concurrent_files: Some(0),
            ..EngineConfig::default()
        };
        assert!(no_workers.validate().is_err());
    }
}
