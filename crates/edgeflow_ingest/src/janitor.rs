//! Stale-state janitor: bounds the completed set.
//!
//! Eviction has no correctness role beyond letting a file with a previously
//! seen name be processed again once it is re-dropped after the retention window.

use crate::stats::Counters;
use crate::tracker::Tracker;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// One eviction pass. Returns the number of entries dropped.
pub(crate) fn sweep(
    tracker: &Tracker,
    counters: &Counters,
    now: DateTime<Utc>,
    retention: Duration,
) -> usize {
    let evicted = tracker.evict_older_than(now, retention);
    if evicted > 0 {
        Counters::add(&counters.evicted, evicted as u64);
        info!(evicted, "Evicted stale completed entries");
    } else {
        debug!("Janitor sweep found nothing to evict");
    }
    evicted
}

/// Sweep every `every` until the shutdown flag flips (or its sender is dropped).
pub(crate) async fn run_loop(
    tracker: Arc<Tracker>,
    counters: Arc<Counters>,
    every: Duration,
    retention: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately, skip it
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                sweep(&tracker, &counters, Utc::now(), retention);
            }
        }
    }

    debug!("Janitor loop stopped");
}
