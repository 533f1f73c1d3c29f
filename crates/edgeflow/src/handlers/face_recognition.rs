use super::{read_record, store_record};
use crate::records::FaceRecognition;
use crate::store::RecordStore;
use async_trait::async_trait;
use edgeflow_ingest::FileHandler;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct FaceRecognitionHandler {
    store: Arc<dyn RecordStore>,
}

impl FaceRecognitionHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FileHandler for FaceRecognitionHandler {
    fn name(&self) -> &str {
        "face_recognition"
    }

    async fn process_file(&self, path: &Path) -> anyhow::Result<()> {
        let record: FaceRecognition = read_record(path).await?;
        let (key, result) = store_record(self.store.as_ref(), &record).await?;
        info!(
            camera_id = %record.camera_id,
            person_id = %record.person_id,
            confidence = record.confidence,
            key = %key,
            result = ?result,
            "Stored face recognition"
        );
        Ok(())
    }
}
