use super::{read_record, store_record};
use crate::records::Alert;
use crate::store::RecordStore;
use async_trait::async_trait;
use edgeflow_ingest::FileHandler;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Handler for one alert type; each type gets its own folder and instance.
pub struct AlertHandler {
    alert_type: String,
    name: String,
    store: Arc<dyn RecordStore>,
}

impl AlertHandler {
    pub fn new(alert_type: impl Into<String>, store: Arc<dyn RecordStore>) -> Self {
        let alert_type = alert_type.into();
        Self {
            name: format!("alert:{}", alert_type),
            alert_type,
            store,
        }
    }

    pub fn alert_type(&self) -> &str {
        &self.alert_type
    }
}

#[async_trait]
impl FileHandler for AlertHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process_file(&self, path: &Path) -> anyhow::Result<()> {
        let mut record: Alert = read_record(path).await?;
        if !record.alert_type.is_empty() && record.alert_type != self.alert_type {
            debug!(
                file = %path.display(),
                payload_type = %record.alert_type,
                folder_type = %self.alert_type,
                "Alert type in payload overridden by folder"
            );
        }
        record.alert_type = self.alert_type.clone();

        let (key, result) = store_record(self.store.as_ref(), &record).await?;
        info!(
            alert_type = %record.alert_type,
            camera_id = %record.camera_id,
            severity = ?record.severity,
            key = %key,
            result = ?result,
            "Stored alert"
        );
        Ok(())
    }
}
