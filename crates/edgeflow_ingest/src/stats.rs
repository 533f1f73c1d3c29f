//! Engine counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters bumped by the scan loop, workers and janitor
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub scans: AtomicU64,
    pub scan_errors: AtomicU64,
    pub admitted: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub archive_errors: AtomicU64,
    pub evicted: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, in_flight: usize, completed: usize, active: usize) -> EngineStats {
        EngineStats {
            scans: self.scans.load(Ordering::Relaxed),
            scan_errors: self.scan_errors.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            archive_errors: self.archive_errors.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            in_flight,
            completed,
            active,
        }
    }
}

/// Point-in-time view of engine activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Binding scans attempted (one per binding per tick)
    pub scans: u64,
    /// Binding scans that failed to list their directory
    pub scan_errors: u64,
    /// Files claimed and handed to a worker
    pub admitted: u64,
    /// Handler invocations that succeeded
    pub succeeded: u64,
    /// Handler invocations that returned an error
    pub failed: u64,
    /// Files that could not be copied into their archive directory
    pub archive_errors: u64,
    /// Completed entries dropped by the janitor
    pub evicted: u64,
    /// Paths currently claimed
    pub in_flight: usize,
    /// Paths still suppressed from re-discovery
    pub completed: usize,
    /// Worker tasks not yet done archiving
    pub active: usize,
}
