//! Throwaway Firefox profiles.
//!
//! Each window starts from an empty temporary directory that receives a
//! `user.js` and a copy of the automation extension. The directory is
//! deleted when the [`Profile`] drops.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// Automation extension discovery and installation.
pub mod extensions;

/// `user.js` document model.
pub mod preferences;

// ============================================================================
// Re-exports
// ============================================================================

pub use extensions::{Extension, ExtensionKind};
pub use preferences::{PrefValue, UserJs};

/// Prefix of temporary profile directories.
const PROFILE_PREFIX: &str = "sheets2img-profile-";

// ============================================================================
// Profile
// ============================================================================

/// A temporary Firefox profile directory.
pub struct Profile {
    dir: TempDir,
}

impl Profile {
    /// Creates an empty profile directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the directory cannot be created.
    pub fn new_temp() -> Result<Self> {
        let dir = TempDir::with_prefix(PROFILE_PREFIX)
            .map_err(|e| Error::profile(format!("Failed to create temp profile: {e}")))?;

        debug!(path = %dir.path().display(), "Created temporary profile");
        Ok(Self { dir })
    }

    /// Creates a profile holding the render preferences and `extension`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] or [`Error::Io`] if any file cannot be
    /// written.
    pub fn for_render(extension: &Extension) -> Result<Self> {
        let profile = Self::new_temp()?;
        profile.write_user_js(&preferences::render_defaults())?;
        profile.install_extension(extension)?;
        Ok(profile)
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `user.js`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the file cannot be written.
    pub fn write_user_js(&self, prefs: &UserJs) -> Result<()> {
        let file = self.path().join("user.js");
        fs::write(&file, prefs.to_string()).map_err(|e| {
            Error::profile(format!("Failed to write {}: {e}", file.display()))
        })?;

        debug!(path = %file.display(), prefs = prefs.len(), "Wrote user.js");
        Ok(())
    }

    /// Installs `extension` under `extensions/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if copying fails.
    pub fn install_extension(&self, extension: &Extension) -> Result<PathBuf> {
        let installed = extension.install(&self.path().join("extensions"))?;
        debug!(
            id = extension.id(),
            path = %installed.display(),
            "Installed extension"
        );
        Ok(installed)
    }
}

// ============================================================================
// Tests
// ============================================================================
