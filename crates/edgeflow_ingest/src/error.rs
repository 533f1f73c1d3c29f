//! Error types for the ingestion engine

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Ingest error type
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to prepare watched folder {path}: {source}")]
    BindPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Watched path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to read directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to archive {src} into {dest}: {source}")]
    Archive {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("No Tokio runtime available to start the engine")]
    NoRuntime,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, IngestError>;
