//! Per-file processing task
//!
//! Lifecycle of one admitted file, strictly in order:
//! claim (done by the scanner) → handle → release → archive.

use crate::archive::move_file;
use crate::binding::FolderBinding;
use crate::stats::Counters;
use crate::tracker::Tracker;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

/// Result of one handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Handler error chain, formatted with `{:#}`
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Everything that happened to one admitted file
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    /// Original path in the watched folder
    pub path: PathBuf,
    /// Watched folder the file was found in
    pub binding: PathBuf,
    pub handler: String,
    pub outcome: Outcome,
    /// Archive location, `None` when archiving failed and the file stayed put
    pub archived_to: Option<PathBuf>,
}

/// Worker tasks that have been spawned and not yet finished archiving.
///
/// The tracker forgets a path before it is archived, so this is what tells
/// shutdown that nothing is still copying.
#[derive(Debug, Default)]
pub(crate) struct ActiveWorkers {
    count: AtomicUsize,
    idle: Notify,
}

impl ActiveWorkers {
    pub fn enter(self: &Arc<Self>) -> ActiveGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        ActiveGuard {
            workers: self.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Resolves once no guard is alive.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Held by one worker task for its whole life, cancellation included.
#[derive(Debug)]
pub(crate) struct ActiveGuard {
    workers: Arc<ActiveWorkers>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.workers.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.workers.idle.notify_waiters();
        }
    }
}

/// Context a worker needs from its engine
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub tracker: Arc<Tracker>,
    pub counters: Arc<Counters>,
    pub limiter: Option<Arc<Semaphore>>,
}

/// Run the handler for an already-claimed `path` and archive the file.
///
/// The handler runs in its own task so that a panic inside it is reported as
/// a failed outcome instead of leaving the path claimed forever.
pub(crate) async fn run(ctx: WorkerContext, binding: Arc<FolderBinding>, path: PathBuf) -> ProcessedFile {
    let _permit = match &ctx.limiter {
        Some(limiter) => limiter.clone().acquire_owned().await.ok(),
        None => None,
    };

    let handler_name = binding.handler.name().to_string();
    debug!(file = %path.display(), handler = %handler_name, "Processing file");

    let handler = binding.handler.clone();
    let handler_path = path.clone();
    let outcome = match tokio::spawn(async move { handler.process_file(&handler_path).await }).await {
        Ok(Ok(())) => Outcome::Success,
        Ok(Err(e)) => Outcome::Failed(format!("{:#}", e)),
        Err(join_err) if join_err.is_panic() => Outcome::Failed("handler panicked".to_string()),
        Err(join_err) => Outcome::Failed(format!("handler task aborted: {}", join_err)),
    };

    ctx.tracker.release(&path, Utc::now());

    let dest_dir = match &outcome {
        Outcome::Success => {
            Counters::bump(&ctx.counters.succeeded);
            &binding.processed_dir
        }
        Outcome::Failed(message) => {
            Counters::bump(&ctx.counters.failed);
            error!(
                file = %path.display(),
                handler = %handler_name,
                error = %message,
                "Handler failed, routing file to failed archive"
            );
            &binding.failed_dir
        }
    };

    let archived_to = match move_file(&path, dest_dir).await {
        Ok(receipt) => {
            info!(
                file = %path.display(),
                dest = %receipt.dest.display(),
                success = outcome.is_success(),
                "Archived file"
            );
            Some(receipt.dest)
        }
        Err(e) => {
            Counters::bump(&ctx.counters.archive_errors);
            warn!(
                file = %path.display(),
                error = %e,
                "Archive failed, file left in watched folder"
            );
            None
        }
    };

    ProcessedFile {
        path,
        binding: binding.path.clone(),
        handler: handler_name,
        outcome,
        archived_to,
    }
}
