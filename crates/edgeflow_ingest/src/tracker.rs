//! In-flight / completed bookkeeping
//!
//! The only shared mutable state of an engine. Scanner ticks and workers
//! race on the same paths, so the admit check and the insert happen inside
//! one critical section. Nothing here awaits while the lock is held.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct TrackerState {
    in_flight: HashSet<PathBuf>,
    completed: HashMap<PathBuf, DateTime<Utc>>,
}

/// Claim/release ledger keyed by absolute file path
#[derive(Debug, Default)]
pub struct Tracker {
    state: Mutex<TrackerState>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // A panicking holder cannot leave the maps half-updated: every
        // mutation below is a single insert/remove.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admit `path` for processing.
    ///
    /// Returns `false` without side effects when the path is already in
    /// flight or still inside the completed window.
    pub fn try_claim(&self, path: &Path) -> bool {
        let mut state = self.lock();
        if state.in_flight.contains(path) || state.completed.contains_key(path) {
            return false;
        }
        state.in_flight.insert(path.to_path_buf());
        true
    }

    /// Mark `path` finished, successfully or not. Failed files count as
    /// completed too, so they are not picked up again from the same spot.
    pub fn release(&self, path: &Path, completed_at: DateTime<Utc>) {
        let mut state = self.lock();
        state.in_flight.remove(path);
        state.completed.insert(path.to_path_buf(), completed_at);
    }

    /// Drop completed entries finished more than `retention` before `now`.
    /// Returns how many were evicted.
    pub fn evict_older_than(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };

        let mut state = self.lock();
        let before = state.completed.len();
        state.completed.retain(|_, completed_at| *completed_at >= cutoff);
        before - state.completed.len()
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.lock().in_flight.contains(path)
    }

    pub fn is_completed(&self, path: &Path) -> bool {
        self.lock().completed.contains_key(path)
    }

    /// `(in_flight, completed)` sizes, read under one lock.
    pub fn counts(&self) -> (usize, usize) {
        let state = self.lock();
        (state.in_flight.len(), state.completed.len())
    }
}
