//! Archival mover: copy into `processed/` or `failed/`, then delete the original.
//!
//! Archive directories may sit on a different volume than the watched folder,
//! so files are copied, not renamed. The copy lands under a hidden temporary
//! name inside the destination and is renamed into place; readers of the
//! archive never see a half-copied file.

use crate::error::{IngestError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where an archived file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    /// Final path inside the archive directory
    pub dest: PathBuf,
    /// Bytes copied
    pub bytes: u64,
    /// False when the copy succeeded but the original could not be deleted
    pub original_removed: bool,
}

fn staging_path(dest_dir: &Path, file_name: &str) -> PathBuf {
    dest_dir.join(format!(".{}.partial", file_name))
}

/// Move `src` into `dest_dir`, keeping its file name.
///
/// Copy failures leave `src` untouched and return an error. Once the copy is
/// in place, a failure to delete `src` is only logged; the returned receipt
/// has `original_removed == false` and the file exists in both places.
/// An existing file with the same name in `dest_dir` is replaced.
pub async fn move_file(src: &Path, dest_dir: &Path) -> Result<ArchiveReceipt> {
    let file_name = src
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IngestError::Archive {
            src: src.to_path_buf(),
            dest: dest_dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
        })?;

    let dest = dest_dir.join(file_name);
    let staging = staging_path(dest_dir, file_name);

    let bytes = match copy_and_publish(src, &staging, &dest).await {
        Ok(bytes) => bytes,
        Err(source) => {
            if let Err(e) = tokio::fs::remove_file(&staging).await {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(file = %staging.display(), error = %e, "Failed to clean staging copy");
                }
            }
            return Err(IngestError::Archive {
                src: src.to_path_buf(),
                dest,
                source,
            });
        }
    };

    let original_removed = match tokio::fs::remove_file(src).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                file = %src.display(),
                dest = %dest.display(),
                error = %e,
                "Archived copy written but original could not be removed"
            );
            false
        }
    };

    Ok(ArchiveReceipt {
        dest,
        bytes,
        original_removed,
    })
}

async fn copy_and_publish(src: &Path, staging: &Path, dest: &Path) -> io::Result<u64> {
    let bytes = tokio::fs::copy(src, staging).await?;
    tokio::fs::OpenOptions::new()
        .write(true)
        .open(staging)
        .await?
        .sync_all()
        .await?;
    tokio::fs::rename(staging, dest).await?;
    Ok(bytes)
}
