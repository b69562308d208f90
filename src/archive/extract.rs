//! Zip extraction.

use std::fs::File;
use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};

use super::fetch::Download;
use super::source::ArchiveSource;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of the extraction directory.
pub const EXTRACT_DIR_PREFIX: &str = "gs2imgx-";

// ============================================================================
// extract
// ============================================================================

/// Extracts a downloaded archive into a fresh temporary directory.
///
/// The download directory is removed once extraction finishes, whether or
/// not it succeeded.
///
/// # Errors
///
/// Returns [`Error::Extraction`] if the archive is corrupt or cannot be
/// written out.
pub async fn extract(download: Download) -> Result<ArchiveSource> {
    let archive = download.path().to_path_buf();

    let result = tokio::task::spawn_blocking(move || extract_to_temp(&archive))
        .await
        .map_err(|e| Error::extraction(format!("Extraction task failed: {e}")))?;

    if let Err(e) = download.close() {
        warn!(error = %e, "Failed to remove download directory");
    }

    result.map(ArchiveSource::new)
}

fn extract_to_temp(archive: &Path) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix(EXTRACT_DIR_PREFIX)
        .tempdir()
        .map_err(|e| Error::extraction(format!("Failed to create extraction directory: {e}")))?;

    let file = File::open(archive)
        .map_err(|e| Error::extraction(format!("Failed to open {}: {e}", archive.display())))?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| Error::extraction(format!("Corrupt archive: {e}")))?;

    let entries = zip.len();
    zip.extract(dir.path())
        .map_err(|e| Error::extraction(format!("Failed to extract archive: {e}")))?;

    debug!(entries, dir = %dir.path().display(), "Archive extracted");
    Ok(dir)
}

// ============================================================================
// Tests
// ============================================================================
