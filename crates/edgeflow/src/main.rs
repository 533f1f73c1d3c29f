//! Edgeflow - camera data ingestion service
//!
//! Usage:
//!   edgeflow run                  # Watch the stream folders until SIGINT/SIGTERM
//!   edgeflow scan-once            # Process whatever is ready now, then exit
//!   edgeflow bindings             # List bound folders as JSON
//!   edgeflow config               # Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgeflow::{build_engine, AppConfig, DirectoryStore, RecordStore};
use edgeflow_ingest::{IngestEngine, Outcome};
use edgeflow_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How long `run` waits for spawned workers to finish archiving after the loops stop
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(name = "edgeflow", about = "Folder-based camera data ingestion")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.edgeflow/config.toml when present)
    #[arg(long, global = true, env = "EDGEFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Override the data root from the config file
    #[arg(long, global = true, env = "EDGEFLOW_DATA_ROOT")]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch every stream folder until interrupted
    Run,

    /// Run a single scan, wait for its files, and exit (non-zero if any failed)
    ScanOnce,

    /// Bind every stream folder and print the bindings as JSON
    Bindings,

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(LogConfig {
        app_name: "edgeflow",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        eprintln!("Warning: {:#}", e);
    }

    match run_command(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_command(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::resolve(cli.config.as_deref())?;
    if let Some(data_root) = cli.data_root {
        config.data_root = data_root;
    }

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("edgeflow")
        .build()
        .context("failed to build Tokio runtime")?;

    runtime.block_on(dispatch(cli.command, config))
}

async fn dispatch(command: Commands, config: AppConfig) -> Result<ExitCode> {
    let store: Arc<dyn RecordStore> = Arc::new(DirectoryStore::new(config.store_dir.clone()));
    let engine = build_engine(&config, store)?;

    match command {
        Commands::Run => run_service(&engine, &config).await,
        Commands::ScanOnce => scan_once(&engine).await,
        Commands::Bindings => {
            println!("{}", serde_json::to_string_pretty(&engine.bindings())?);
            Ok(ExitCode::SUCCESS)
        }
        // Printed before the runtime starts, so no folders get created
        Commands::Config => Ok(ExitCode::SUCCESS),
    }
}

async fn run_service(engine: &IngestEngine, config: &AppConfig) -> Result<ExitCode> {
    let mut shutdown = install_signal_handlers()?;

    info!(
        data_root = %config.data_root.display(),
        store_dir = %config.store_dir.display(),
        "Starting Edgeflow"
    );
    engine.start()?;

    let _ = shutdown.recv().await;

    engine.stop().await?;
    if !engine.wait_idle(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS)).await {
        warn!(
            active = engine.stats().active,
            "Shutdown timeout reached with files still being processed"
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn scan_once(engine: &IngestEngine) -> Result<ExitCode> {
    let pass = engine.scan_once().await;
    let unstable = pass.unstable;
    let scan_errors = pass.scan_errors;
    let results = pass.join().await;

    let mut failed = 0usize;
    for file in &results {
        let archived = file
            .archived_to
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not archived)".to_string());
        match &file.outcome {
            Outcome::Success => {
                println!("ok      {} -> {}", file.path.display(), archived);
            }
            Outcome::Failed(reason) => {
                failed += 1;
                println!("failed  {} -> {} ({})", file.path.display(), archived, reason);
            }
        }
    }
    println!(
        "{} processed, {} failed, {} not yet stable, {} scan errors",
        results.len(),
        failed,
        unstable,
        scan_errors
    );

    if failed > 0 || scan_errors > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn install_signal_handlers() -> Result<mpsc::UnboundedReceiver<()>> {
    let (tx, rx) = mpsc::unbounded_channel();

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        std::thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {}, shutting down...", sig);
                let _ = tx.send(());
            }
        });
    }

    #[cfg(windows)]
    {
        ctrlc::set_handler(move || {
            info!("Received Ctrl+C, shutting down...");
            let _ = tx.send(());
        })?;
    }

    Ok(rx)
}
