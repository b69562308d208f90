//! Extracted archive access.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{Error, Result};

/// Extension of tab documents.
const TAB_EXTENSION: &str = "html";

// ============================================================================
// ArchiveSource
// ============================================================================

/// An extracted export: one `<id>.html` document per tab.
///
/// Owns the extraction directory; dropping or closing it deletes the
/// directory.
pub struct ArchiveSource {
    dir: TempDir,
}

impl fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveSource")
            .field("dir", &self.dir.path())
            .finish()
    }
}

impl ArchiveSource {
    pub(crate) fn new(dir: TempDir) -> Self {
        Self { dir }
    }

    /// Returns the extraction directory.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Lists tab identifiers, sorted.
    ///
    /// Only top-level files with the `html` extension count; everything
    /// else is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(self.dir())
            .await
            .map_err(|e| Error::extraction(format!("Failed to read extracted archive: {e}")))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::extraction(format!("Failed to read extracted archive: {e}")))?
        {
            let path = entry.path();
            if path.extension() != Some(OsStr::new(TAB_EXTENSION)) {
                continue;
            }
            if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(OsStr::to_str) {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        debug!(tabs = ids.len(), "Listed archive tabs");
        Ok(ids)
    }

    /// Returns the document path of tab `id`.
    #[must_use]
    pub fn load(&self, id: &str) -> PathBuf {
        self.dir().join(format!("{id}.{TAB_EXTENSION}"))
    }

    /// Deletes the extraction directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if removal fails.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
