//! Automation extension discovery and installation.
//!
//! The extension is resolved once, when the driver is built: its manifest is
//! read and the gecko id extracted, so a broken extension fails the run before
//! any Firefox process starts. Each profile then receives a copy under
//! `extensions/<id>` (unpacked) or `extensions/<id>.xpi` (packed).

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Manifest pointers that may hold the gecko id, newest first.
const GECKO_ID_POINTERS: [&str; 2] = [
    "/browser_specific_settings/gecko/id",
    "/applications/gecko/id",
];

// ============================================================================
// ExtensionKind
// ============================================================================

/// On-disk layout of the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    /// Directory with `manifest.json` at its root.
    Unpacked,
    /// `.xpi` (zip) archive.
    Packed,
}

// ============================================================================
// Extension
// ============================================================================

/// A validated automation extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    path: PathBuf,
    kind: ExtensionKind,
    id: String,
}

impl Extension {
    /// Reads the manifest at `path`. Directories are unpacked extensions,
    /// files are archives.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `path` does not exist
    /// - [`Error::Profile`] if the manifest is missing, malformed or has no
    ///   gecko id
    pub fn resolve(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (kind, manifest) = if path.is_dir() {
            (ExtensionKind::Unpacked, read_unpacked_manifest(&path)?)
        } else if path.is_file() {
            (ExtensionKind::Packed, read_packed_manifest(&path)?)
        } else {
            return Err(Error::config(format!(
                "Extension not found at: {}",
                path.display()
            )));
        };

        let id = gecko_id(&manifest)?;
        Ok(Self { path, kind, id })
    }

    /// Extension id from the manifest.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Location on disk.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }

    /// Copies the extension into a profile's `extensions` directory and
    /// returns the installed path.
    pub(crate) fn install(&self, extensions_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(extensions_dir)?;

        match self.kind {
            ExtensionKind::Unpacked => {
                let dest = extensions_dir.join(&self.id);
                copy_tree(&self.path, &dest)?;
                Ok(dest)
            }
            ExtensionKind::Packed => {
                let dest = extensions_dir.join(format!("{}.xpi", self.id));
                fs::copy(&self.path, &dest)?;
                Ok(dest)
            }
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

fn read_unpacked_manifest(dir: &Path) -> Result<String> {
    let manifest = dir.join("manifest.json");
    fs::read_to_string(&manifest).map_err(|e| {
        Error::profile(format!(
            "Extension manifest not found at {}: {e}",
            manifest.display()
        ))
    })
}

fn read_packed_manifest(archive: &Path) -> Result<String> {
    let invalid = |e: zip::result::ZipError| {
        Error::profile(format!(
            "Invalid extension archive {}: {e}",
            archive.display()
        ))
    };

    let mut zip = ZipArchive::new(fs::File::open(archive)?).map_err(invalid)?;
    let mut entry = zip.by_name("manifest.json").map_err(invalid)?;

    let mut manifest = String::new();
    entry.read_to_string(&mut manifest)?;
    Ok(manifest)
}

fn gecko_id(manifest: &str) -> Result<String> {
    let json: Value = serde_json::from_str(manifest)
        .map_err(|e| Error::profile(format!("Invalid manifest.json: {e}")))?;

    GECKO_ID_POINTERS
        .iter()
        .find_map(|pointer| json.pointer(pointer).and_then(Value::as_str))
        .map(str::to_owned)
        .ok_or_else(|| Error::profile("Extension manifest has no gecko id"))
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
