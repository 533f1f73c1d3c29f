//! File handlers for the camera data streams
//!
//! Each handler reads one dropped JSON file, validates it into a record and
//! upserts it into the [`RecordStore`]. Any error sends the file to the
//! binding's failed directory.

mod alert;
mod face_recognition;
mod people_count;
mod vehicle_count;

pub use alert::AlertHandler;
pub use face_recognition::FaceRecognitionHandler;
pub use people_count::PeopleCountHandler;
pub use vehicle_count::VehicleCountHandler;

use crate::records::{self, Record};
use crate::store::{RecordStore, UpsertResult};
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and validate one payload file.
pub(crate) async fn read_record<R>(path: &Path) -> anyhow::Result<R>
where
    R: Record + DeserializeOwned,
{
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let record = records::parse(&bytes)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(record)
}

/// Upsert `record` under its natural key.
pub(crate) async fn store_record<R>(store: &dyn RecordStore, record: &R) -> anyhow::Result<(String, UpsertResult)>
where
    R: Record + Sync,
{
    let key = record.natural_key();
    let value = serde_json::to_value(record)?;
    let result = store
        .upsert(R::KIND, &key, value)
        .await
        .with_context(|| format!("failed to store {} record {}", R::KIND, key))?;
    Ok((key, result))
}
