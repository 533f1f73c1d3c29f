use super::{read_record, store_record};
use crate::records::VehicleCount;
use crate::store::RecordStore;
use async_trait::async_trait;
use edgeflow_ingest::FileHandler;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct VehicleCountHandler {
    store: Arc<dyn RecordStore>,
}

impl VehicleCountHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FileHandler for VehicleCountHandler {
    fn name(&self) -> &str {
        "vehicle_count"
    }

    async fn process_file(&self, path: &Path) -> anyhow::Result<()> {
        let record: VehicleCount = read_record(path).await?;
        let (key, result) = store_record(self.store.as_ref(), &record).await?;
        info!(
            camera_id = %record.camera_id,
            key = %key,
            total = record.total(),
            result = ?result,
            "Stored vehicle count"
        );
        Ok(())
    }
}
