//! Shared logging setup for Edgeflow binaries.
//!
//! Every binary logs to stderr and to a size-rotated file under
//! `$EDGEFLOW_HOME/logs` (default `~/.edgeflow/logs`). `RUST_LOG` overrides
//! the default filter for both outputs.

mod rolling;

use anyhow::{Context, Result};
use rolling::RollingFile;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "edgeflow=info,edgeflow_ingest=info";
const QUIET_CONSOLE_FILTER: &str = "warn";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration shared by Edgeflow binaries.
#[derive(Debug, Clone)]
pub struct LogConfig<'a> {
    /// Log file base name (`<app_name>.log`)
    pub app_name: &'a str,
    /// Mirror the full filter to stderr; otherwise stderr only shows warnings
    pub verbose: bool,
    /// Override the log directory (defaults to [`logs_dir`])
    pub log_dir: Option<PathBuf>,
}

/// Install the global tracing subscriber: rolling file + stderr.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = match config.log_dir {
        Some(dir) => dir,
        None => logs_dir(),
    };
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create logs directory: {}", log_dir.display()))?;

    let log_file = RollingFile::open(log_dir, config.app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
        .with_context(|| format!("Failed to open log file for {}", config.app_name))?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new(QUIET_CONSOLE_FILTER)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Global tracing subscriber already installed")?;

    Ok(())
}

/// Edgeflow home directory: `$EDGEFLOW_HOME`, else `~/.edgeflow`.
///
/// Falls back to a relative `.edgeflow` when no home directory is known
/// (minimal containers, service accounts).
pub fn edgeflow_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("EDGEFLOW_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".edgeflow"))
        .unwrap_or_else(|| PathBuf::from(".edgeflow"))
}

/// Logs directory: `<edgeflow_home>/logs`
pub fn logs_dir() -> PathBuf {
    edgeflow_home().join("logs")
}
