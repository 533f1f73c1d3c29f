use super::{read_record, store_record};
use crate::records::PeopleCount;
use crate::store::RecordStore;
use async_trait::async_trait;
use edgeflow_ingest::FileHandler;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct PeopleCountHandler {
    store: Arc<dyn RecordStore>,
}

impl PeopleCountHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FileHandler for PeopleCountHandler {
    fn name(&self) -> &str {
        "people_count"
    }

    async fn process_file(&self, path: &Path) -> anyhow::Result<()> {
        let record: PeopleCount = read_record(path).await?;
        let (key, result) = store_record(self.store.as_ref(), &record).await?;
        info!(
            camera_id = %record.camera_id,
            key = %key,
            count_in = record.count_in,
            count_out = record.count_out,
            result = ?result,
            "Stored people count"
        );
        Ok(())
    }
}
