//! Edgeflow Ingest - Folder-as-Queue Ingestion Engine
//!
//! Cameras drop JSON files into well-known directories. The engine polls those
//! directories, claims files that look finished, hands each one to the handler
//! bound to its folder, and archives it into `processed/` or `failed/`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌───────────────┐
//! │   Scanner   │     │   Tracker   │     │   Worker    │     │   Archiver    │
//! │ (tick, glob │────▶│ (claim once │────▶│ (handler    │────▶│ (processed/ or│
//! │  stability) │     │  per path)  │     │  per file)  │     │    failed/)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └───────────────┘
//!                            ▲
//!                            │ evicts completed entries
//!                     ┌─────────────┐
//!                     │   Janitor   │
//!                     └─────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Binding**: a watched folder + base-name glob + handler + archival dirs
//! - **Claim**: marking a path in-flight so no second worker picks it up
//! - **Stability window**: files younger than this (by mtime) are left alone
//! - **Completed window**: finished paths are suppressed until the janitor evicts them
//!
//! Delivery is at-least-once across restarts; handlers are expected to upsert.

pub mod archive;
pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod janitor;
pub mod patterns;
pub mod scanner;
pub mod stats;
pub mod tracker;
pub mod worker;

// Re-exports for convenience
pub use archive::{move_file, ArchiveReceipt};
pub use binding::{BindingInfo, BindingRegistry, FolderBinding};
pub use config::EngineConfig;
pub use engine::{IngestEngine, ScanPass};
pub use error::{IngestError, Result};
pub use handler::{FileHandler, FnHandler, SharedHandler};
pub use scanner::CandidateFile;
pub use stats::EngineStats;
pub use tracker::Tracker;
pub use worker::{Outcome, ProcessedFile};
