//! Edgeflow - camera data ingestion service
//!
//! Edge cameras drop JSON payloads into per-stream folders under a data root.
//! This crate wires those folders to record handlers on top of
//! [`edgeflow_ingest`], and persists the parsed records in a [`RecordStore`].
//!
//! # Folder layout
//!
//! ```text
//! <data_root>/
//! ├── people-count/        PeopleCountHandler
//! ├── vehicle-count/       VehicleCountHandler
//! ├── face-recognition/    FaceRecognitionHandler
//! └── alerts/
//!     ├── intrusion/       AlertHandler("intrusion")
//!     └── ...              one folder per configured alert type
//! ```
//!
//! Every folder gets its own `processed/` and `failed/` archive directories.

pub mod config;
pub mod error;
pub mod handlers;
pub mod records;
pub mod service;
pub mod store;

pub use config::AppConfig;
pub use error::{ConfigError, RecordError, StoreError};
pub use records::{Alert, FaceRecognition, PeopleCount, Record, RecordKind, Severity, VehicleCount};
pub use service::build_engine;
pub use store::{DirectoryStore, MemoryStore, RecordStore, UpsertResult};
