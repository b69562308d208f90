//! Spreadsheet export retrieval.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `fetch` | Download of the zip export into a `gs2imgz-` directory |
//! | `extract` | Extraction into a `gs2imgx-` directory |
//! | `source` | Listing and locating tab documents |

// ============================================================================
// Submodules
// ============================================================================

pub mod extract;
pub mod fetch;
pub mod source;

// ============================================================================
// Re-exports
// ============================================================================

pub use extract::extract;
pub use fetch::{ArchiveFetcher, DEFAULT_EXPORT_URL, Download, HttpFetcher};
pub use source::ArchiveSource;

// ============================================================================
// Test Support
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Cursor, Write};

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    /// Builds an in-memory zip from `(name, contents)` pairs.
    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start file");
            writer.write_all(contents.as_bytes()).expect("write entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }
}
