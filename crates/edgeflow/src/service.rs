//! Binding the camera stream folders to their handlers

use crate::config::AppConfig;
use crate::handlers::{AlertHandler, FaceRecognitionHandler, PeopleCountHandler, VehicleCountHandler};
use crate::store::RecordStore;
use anyhow::Context;
use edgeflow_ingest::{IngestEngine, SharedHandler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const PEOPLE_COUNT_DIR: &str = "people-count";
pub const VEHICLE_COUNT_DIR: &str = "vehicle-count";
pub const FACE_RECOGNITION_DIR: &str = "face-recognition";
pub const ALERTS_DIR: &str = "alerts";

/// Every stream folder accepts only JSON payloads.
pub const PAYLOAD_PATTERN: &str = "*.json";

/// Folder for one alert type.
pub fn alert_dir(data_root: &Path, alert_type: &str) -> PathBuf {
    data_root.join(ALERTS_DIR).join(alert_type)
}

/// Folder-to-handler table for `config`, in binding order.
pub fn stream_folders(config: &AppConfig, store: &Arc<dyn RecordStore>) -> Vec<(PathBuf, SharedHandler)> {
    let root = &config.data_root;
    let people: SharedHandler = Arc::new(PeopleCountHandler::new(store.clone()));
    let vehicles: SharedHandler = Arc::new(VehicleCountHandler::new(store.clone()));
    let faces: SharedHandler = Arc::new(FaceRecognitionHandler::new(store.clone()));

    let mut folders = vec![
        (root.join(PEOPLE_COUNT_DIR), people),
        (root.join(VEHICLE_COUNT_DIR), vehicles),
        (root.join(FACE_RECOGNITION_DIR), faces),
    ];
    for alert_type in &config.alert_types {
        let handler: SharedHandler = Arc::new(AlertHandler::new(alert_type.clone(), store.clone()));
        folders.push((alert_dir(root, alert_type), handler));
    }
    folders
}

/// Create an engine with every stream folder bound. The engine is not started.
pub fn build_engine(config: &AppConfig, store: Arc<dyn RecordStore>) -> anyhow::Result<IngestEngine> {
    config.validate()?;
    let engine = IngestEngine::new(config.engine.clone())?;

    for (folder, handler) in stream_folders(config, &store) {
        let info = engine
            .bind(&folder, PAYLOAD_PATTERN, handler)
            .with_context(|| format!("failed to bind {}", folder.display()))?;
        info!(
            folder = %info.path.display(),
            handler = %info.handler,
            pattern = %info.pattern,
            "Bound stream folder"
        );
    }

    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> AppConfig {
        AppConfig {
            data_root: root.join("data"),
            store_dir: root.join("records"),
            alert_types: vec!["intrusion".to_string(), "fire".to_string()],
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_build_engine_binds_every_stream() {
        let temp = TempDir::new().unwrap();
        let config = config_for(temp.path());
        let engine = build_engine(&config, Arc::new(MemoryStore::new())).unwrap();

        let mut handlers: Vec<String> = engine.bindings().into_iter().map(|b| b.handler).collect();
        handlers.sort();
        assert_eq!(
            handlers,
            vec![
                "alert:fire",
                "alert:intrusion",
                "face_recognition",
                "people_count",
                "vehicle_count"
            ]
        );

        let data = temp.path().join("data");
        for dir in [
            data.join(PEOPLE_COUNT_DIR),
            data.join(VEHICLE_COUNT_DIR),
            data.join(FACE_RECOGNITION_DIR),
            alert_dir(&data, "intrusion"),
            alert_dir(&data, "fire"),
        ] {
            assert!(dir.join("processed").is_dir(), "{}", dir.display());
            assert!(dir.join("failed").is_dir(), "{}", dir.display());
        }
        assert!(engine.bindings().iter().all(|b| b.pattern == PAYLOAD_PATTERN));
        assert!(!engine.is_running());
    }

    #[test]
    fn test_build_engine_rejects_invalid_config() {
        let temp = TempDir::new().unwrap();
        let mut config = config_for(temp.path());
        config.alert_types.push("../escape".to_string());
        assert!(build_engine(&config, Arc::new(MemoryStore::new())).is_err());
    }

    #[test]
    fn test_no_alert_types_binds_only_core_streams() {
        let temp = TempDir::new().unwrap();
        let mut config = config_for(temp.path());
        config.alert_types.clear();
        let engine = build_engine(&config, Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(engine.bindings().len(), 3);
    }
}
