//! Ingestion engine: owns the bindings, the tracker and the background loops.
//!
//! Design principles:
//! - One scan loop per engine; bindings are scanned one after another within a tick
//! - One detached task per admitted file; bindings never wait on each other
//! - Claim happens on the scan loop before the worker is spawned, so admission
//!   and dispatch are a single step
//! - `stop()` waits for the loops only; handlers already running are allowed to finish

use crate::binding::{BindingInfo, BindingRegistry};
use crate::config::EngineConfig;
use crate::error::{IngestError, Result};
use crate::handler::SharedHandler;
use crate::janitor;
use crate::scanner::scan_binding;
use crate::stats::{Counters, EngineStats};
use crate::tracker::Tracker;
use crate::worker::{self, ActiveWorkers, ProcessedFile, WorkerContext};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// ============================================================================
// Scan pass
// ============================================================================

/// Result of one scanner tick over every binding
#[derive(Debug, Default)]
pub struct ScanPass {
    /// Stable, pattern-matching files seen across all bindings
    pub candidates: usize,
    /// Matching files held back by the stability window
    pub unstable: usize,
    /// Bindings whose directory could not be listed this tick
    pub scan_errors: usize,
    /// Paths claimed during this pass, in dispatch order
    pub admitted: Vec<PathBuf>,
    handles: Vec<JoinHandle<ProcessedFile>>,
}

impl ScanPass {
    /// Wait for every worker spawned by this pass.
    pub async fn join(self) -> Vec<ProcessedFile> {
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(processed) => results.push(processed),
                Err(e) => warn!(error = %e, "Worker task did not complete"),
            }
        }
        results
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug)]
struct Shared {
    config: EngineConfig,
    registry: BindingRegistry,
    tracker: Arc<Tracker>,
    counters: Arc<Counters>,
    limiter: Option<Arc<Semaphore>>,
    active: Arc<ActiveWorkers>,
}

impl Shared {
    fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            tracker: self.tracker.clone(),
            counters: self.counters.clone(),
            limiter: self.limiter.clone(),
        }
    }

    async fn scan_pass(&self) -> ScanPass {
        let mut pass = ScanPass::default();
        let window = self.config.stability_window();

        for binding in self.registry.snapshot() {
            Counters::bump(&self.counters.scans);

            let listing = match scan_binding(&binding, window, SystemTime::now()).await {
                Ok(listing) => listing,
                Err(e) => {
                    Counters::bump(&self.counters.scan_errors);
                    pass.scan_errors += 1;
                    warn!(binding = %binding.path.display(), error = %e, "Scan failed, retrying next tick");
                    continue;
                }
            };

            pass.candidates += listing.candidates.len();
            pass.unstable += listing.unstable;

            for candidate in listing.candidates {
                if !self.tracker.try_claim(&candidate.path) {
                    continue;
                }
                Counters::bump(&self.counters.admitted);
                debug!(file = %candidate.path.display(), "Admitted file");

                pass.admitted.push(candidate.path.clone());
                let active = self.active.enter();
                let run = worker::run(self.worker_context(), binding.clone(), candidate.path);
                pass.handles.push(tokio::spawn(async move {
                    let _active = active;
                    run.await
                }));
            }
        }

        pass
    }
}

#[derive(Debug)]
struct RunningLoops {
    shutdown_tx: watch::Sender<bool>,
    scan: JoinHandle<()>,
    janitor: JoinHandle<()>,
}

/// Folder-as-queue ingestion engine
///
/// Dropping a running engine drops its shutdown sender, which also ends the loops.
#[derive(Debug)]
pub struct IngestEngine {
    shared: Arc<Shared>,
    running: Mutex<Option<RunningLoops>>,
}

impl IngestEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let limiter = config
            .max_concurrent_files
            .map(|n| Arc::new(Semaphore::new(n)));

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                registry: BindingRegistry::new(),
                tracker: Arc::new(Tracker::new()),
                counters: Arc::new(Counters::default()),
                limiter,
                active: Arc::new(ActiveWorkers::default()),
            }),
            running: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Watch `path` for files matching `pattern` and hand them to `handler`.
    ///
    /// Creates the folder and its archive directories. Binding an already
    /// bound folder replaces the previous binding. Safe while running: the
    /// next tick picks the new binding up.
    pub fn bind(
        &self,
        path: impl AsRef<Path>,
        pattern: &str,
        handler: SharedHandler,
    ) -> Result<BindingInfo> {
        let binding = self
            .shared
            .registry
            .bind(path.as_ref(), pattern, handler, &self.shared.config)?;
        Ok(binding.info())
    }

    pub fn bindings(&self) -> Vec<BindingInfo> {
        self.shared
            .registry
            .snapshot()
            .iter()
            .map(|b| b.info())
            .collect()
    }

    /// Spawn the scan and janitor loops on the current Tokio runtime.
    ///
    /// The first scan runs immediately. Calling `start` on a running engine is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            debug!("Engine already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| IngestError::NoRuntime)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scan = runtime.spawn(scan_loop(self.shared.clone(), shutdown_rx.clone()));
        let janitor = runtime.spawn(janitor::run_loop(
            self.shared.tracker.clone(),
            self.shared.counters.clone(),
            self.shared.config.janitor_interval(),
            self.shared.config.retention(),
            shutdown_rx,
        ));

        if self.shared.registry.is_empty() {
            warn!("Engine started with no bound folders");
        }
        info!(
            bindings = self.shared.registry.len(),
            scan_interval_secs = self.shared.config.scan_interval_secs,
            stability_window_secs = self.shared.config.stability_window_secs,
            "Ingest engine started"
        );

        *running = Some(RunningLoops {
            shutdown_tx,
            scan,
            janitor,
        });
        Ok(())
    }

    /// Signal the loops to exit after their current tick and wait for them.
    ///
    /// Workers already spawned are not cancelled and may still be running
    /// (and archiving) after this returns. Stopping a stopped engine is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let loops = {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            running.take()
        };
        let Some(loops) = loops else {
            debug!("Engine already stopped");
            return Ok(());
        };

        let _ = loops.shutdown_tx.send(true);
        for (name, handle) in [("scan", loops.scan), ("janitor", loops.janitor)] {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Loop task ended abnormally");
            }
        }

        let stats = self.stats();
        info!(
            admitted = stats.admitted,
            succeeded = stats.succeeded,
            failed = stats.failed,
            in_flight = stats.in_flight,
            active = stats.active,
            "Ingest engine stopped"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Run exactly one scanner tick, the same way the background loop does.
    ///
    /// Needs a Tokio runtime; workers are spawned onto it and can be awaited
    /// through [`ScanPass::join`].
    pub async fn scan_once(&self) -> ScanPass {
        self.shared.scan_pass().await
    }

    /// One janitor pass against an explicit clock.
    pub fn sweep_completed(&self, now: DateTime<Utc>) -> usize {
        janitor::sweep(
            &self.shared.tracker,
            &self.shared.counters,
            now,
            self.shared.config.retention(),
        )
    }

    pub fn stats(&self) -> EngineStats {
        let (in_flight, completed) = self.shared.tracker.counts();
        self.shared
            .counters
            .snapshot(in_flight, completed, self.shared.active.count())
    }

    /// Wait until every spawned worker has finished, archiving included.
    ///
    /// Returns `false` if workers were still running when `timeout` elapsed.
    /// Meant for shutdown after [`stop`](Self::stop), when no new workers are spawned.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.shared.active.wait_idle())
            .await
            .is_ok()
    }

    pub fn tracker(&self) -> &Tracker {
        &self.shared.tracker
    }
}

async fn scan_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(shared.config.scan_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let pass = shared.scan_pass().await;
                if !pass.admitted.is_empty() || pass.scan_errors > 0 {
                    debug!(
                        candidates = pass.candidates,
                        admitted = pass.admitted.len(),
                        unstable = pass.unstable,
                        scan_errors = pass.scan_errors,
                        "Scan tick"
                    );
                }
                // Workers run detached; the handles are not needed here.
                drop(pass);
            }
        }
    }

    debug!("Scan loop stopped");
}
