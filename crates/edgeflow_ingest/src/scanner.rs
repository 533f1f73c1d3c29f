//! Directory scanner with an mtime stability filter
//!
//! Producers write files in place, without a rename, so a file that was
//! touched very recently may still be growing. The scanner only yields files
//! whose modification time is at least the stability window in the past.
//! This is a heuristic: a producer that stalls longer than the window
//! mid-write can still be read early.

use crate::binding::FolderBinding;
use crate::error::{IngestError, Result};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// A file that matched its binding's pattern and looks finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub modified_at: SystemTime,
}

/// What one directory listing produced
#[derive(Debug, Default)]
pub struct ScanListing {
    /// Stable, pattern-matching files in path order
    pub candidates: Vec<CandidateFile>,
    /// Pattern-matching files held back by the stability window
    pub unstable: usize,
}

/// True once `now - modified_at >= window`.
///
/// An mtime in the future (clock skew, or a file being touched right now)
/// counts as not yet stable.
pub fn is_stable(modified_at: SystemTime, now: SystemTime, window: Duration) -> bool {
    match now.duration_since(modified_at) {
        Ok(age) => age >= window,
        Err(_) => false,
    }
}

/// List one bound folder, non-recursively.
///
/// Subdirectories (the archive dirs included) are skipped. Entries that vanish
/// between listing and stat are ignored; a failure to open the directory
/// itself is returned so the caller can skip this binding for the tick.
pub async fn scan_binding(
    binding: &FolderBinding,
    window: Duration,
    now: SystemTime,
) -> Result<ScanListing> {
    let mut listing = ScanListing::default();

    let mut entries = tokio::fs::read_dir(&binding.path)
        .await
        .map_err(|source| IngestError::Scan {
            path: binding.path.clone(),
            source,
        })?;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                return Err(IngestError::Scan {
                    path: binding.path.clone(),
                    source,
                })
            }
        };

        let path = entry.path();
        if !binding.pattern.matches_path(&path) {
            continue;
        }

        // Follows symlinks, so a link to a regular file is processed like the file.
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Entry disappeared during scan");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }

        let modified_at = match meta.modified() {
            Ok(t) => t,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "No modification time, skipping");
                continue;
            }
        };

        if is_stable(modified_at, now, window) {
            listing.candidates.push(CandidateFile { path, modified_at });
        } else {
            listing.unstable += 1;
        }
    }

    listing.candidates.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(listing)
}
