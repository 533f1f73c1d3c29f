//! Record store boundary
//!
//! The relational storage layer lives outside this service; handlers only
//! need create-or-update by natural key. `DirectoryStore` is the default
//! persistent backend, `MemoryStore` backs tests and dry runs.

use crate::error::StoreError;
use crate::records::RecordKind;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Whether an upsert inserted a new record or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertResult {
    Created,
    Updated,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert the record, or replace the one already stored under `key`.
    async fn upsert(&self, kind: RecordKind, key: &str, value: Value) -> Result<UpsertResult, StoreError>;

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Value>, StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(RecordKind, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, kind: RecordKind, key: &str, value: Value) -> Result<UpsertResult, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let previous = records.insert((kind, key.to_string()), value);
        Ok(if previous.is_some() {
            UpsertResult::Updated
        } else {
            UpsertResult::Created
        })
    }

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Value>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(&(kind, key.to_string())).cloned())
    }
}

// ============================================================================
// Directory store
// ============================================================================

/// One JSON document per record at `<root>/<kind>/<encoded key>.json`
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, kind: RecordKind, key: &str) -> PathBuf {
        self.root
            .join(kind.as_str())
            .join(format!("{}.json", encode_key(key)))
    }
}

/// Encoded keys longer than this are cut and suffixed with a hash of the full key.
const MAX_ENCODED_KEY_LEN: usize = 160;

/// File-name encoding: keeps `[A-Za-z0-9._-]`, percent-encodes every other byte.
///
/// Long keys become `<prefix>~<blake3 hex>`; `~` never appears in the plain
/// encoding, so the two forms cannot collide.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            // A lone leading dot would make a hidden file or `..`
            b'.' if !out.is_empty() => out.push('.'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    if out.len() > MAX_ENCODED_KEY_LEN {
        let digest = blake3::hash(key.as_bytes()).to_hex();
        out.truncate(MAX_ENCODED_KEY_LEN);
        out.push('~');
        out.push_str(&digest.as_str()[..32]);
    }
    out
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `path`, unique per write.
fn staging_path(path: &Path) -> PathBuf {
    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("record");
    path.with_file_name(format!(".{}.{}-{}.tmp", name, std::process::id(), seq))
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl RecordStore for DirectoryStore {
    async fn upsert(&self, kind: RecordKind, key: &str, value: Value) -> Result<UpsertResult, StoreError> {
        let path = self.record_path(kind, key);
        let dir = self.root.join(kind.as_str());
        tokio::fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;

        let existed = tokio::fs::try_exists(&path).await.map_err(io_err(&path))?;

        let mut body = serde_json::to_vec_pretty(&value)?;
        body.push(b'\n');
        let staging = staging_path(&path);
        tokio::fs::write(&staging, &body).await.map_err(io_err(&staging))?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_err(&path)(e));
        }

        Ok(if existed {
            UpsertResult::Updated
        } else {
            UpsertResult::Created
        })
    }

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(kind, key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("cam-01"), "cam-01");
        assert_eq!(
            encode_key("cam-01@2026-10-18T09:00:00.000Z"),
            "cam-01%402026-10-18T09%3A00%3A00.000Z"
        );
        assert_eq!(encode_key("intrusion/yard"), "intrusion%2Fyard");
        assert_eq!(encode_key(".."), "%2E.");
        assert_ne!(encode_key("a_b"), encode_key("a/b"));
    }

    #[tokio::test]
    async fn test_memory_store_upsert() {
        let store = MemoryStore::new();
        let first = store
            .upsert(RecordKind::PeopleCount, "k", json!({"count_in": 1}))
            .await
            .unwrap();
        let second = store
            .upsert(RecordKind::PeopleCount, "k", json!({"count_in": 2}))
            .await
            .unwrap();

        assert_eq!(first, UpsertResult::Created);
        assert_eq!(second, UpsertResult::Updated);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(RecordKind::PeopleCount, "k").await.unwrap(),
            Some(json!({"count_in": 2}))
        );
        assert_eq!(store.get(RecordKind::Alert, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_directory_store_roundtrip_and_update() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp.path().join("records"));
        let key = "gate@2026-10-18T09:00:00.000Z";

        let created = store
            .upsert(RecordKind::VehicleCount, key, json!({"counts": {"car": 1}}))
            .await
            .unwrap();
        let updated = store
            .upsert(RecordKind::VehicleCount, key, json!({"counts": {"car": 3}}))
            .await
            .unwrap();

        assert_eq!(created, UpsertResult::Created);
        assert_eq!(updated, UpsertResult::Updated);
        let path = store.record_path(RecordKind::VehicleCount, key);
        assert!(path.starts_with(temp.path().join("records").join("vehicle_count")));
        assert_eq!(
            store.get(RecordKind::VehicleCount, key).await.unwrap(),
            Some(json!({"counts": {"car": 3}}))
        );
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
        assert_eq!(store.get(RecordKind::Alert, key).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_directory_store_concurrent_same_key() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(DirectoryStore::new(temp.path().join("records")));
        let key = "cam-1@2026-03-01T12:00:00.000Z";

        let mut tasks = Vec::new();
        for i in 0..64 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .upsert(RecordKind::PeopleCount, key, json!({"count_in": i}))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let path = store.record_path(RecordKind::PeopleCount, key);
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
        let stored = store.get(RecordKind::PeopleCount, key).await.unwrap().unwrap();
        assert!(stored["count_in"].is_u64());
    }

    #[tokio::test]
    async fn test_long_keys_fit_in_a_file_name() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp.path().join("records"));
        let person = "@".repeat(300);
        let key_a = format!("lobby@2026-03-01T08:00:00.000Z#{}a", person);
        let key_b = format!("lobby@2026-03-01T08:00:00.000Z#{}b", person);

        for key in [&key_a, &key_b] {
            let name = store.record_path(RecordKind::FaceRecognition, key);
            let name = name.file_name().unwrap().to_str().unwrap().to_string();
            assert!(name.len() <= 255, "{} bytes", name.len());
        }
        assert_ne!(encode_key(&key_a), encode_key(&key_b));
        assert!(encode_key(&key_a).contains('~'));
        assert!(!encode_key("short@key").contains('~'));

        store
            .upsert(RecordKind::FaceRecognition, &key_a, json!({"person_id": "a"}))
            .await
            .unwrap();
        store
            .upsert(RecordKind::FaceRecognition, &key_b, json!({"person_id": "b"}))
            .await
            .unwrap();
        assert_eq!(
            store.get(RecordKind::FaceRecognition, &key_a).await.unwrap(),
            Some(json!({"person_id": "a"}))
        );
    }
}
