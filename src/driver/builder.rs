//! Driver configuration.
//!
//! ```ignore
//! let driver = Driver::builder()
//!     .binary("/usr/bin/firefox")
//!     .extension("./extension")
//!     .build()
//!     .await?;
//! ```

use std::path::PathBuf;

use crate::error::{Error, Result};

use super::core::Driver;
use super::profile::Extension;

/// Collects driver inputs; nothing touches the filesystem until
/// [`build`](Self::build).
#[derive(Debug, Default, Clone)]
pub struct DriverBuilder {
    binary: Option<PathBuf>,
    extension: Option<PathBuf>,
}

impl DriverBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Firefox executable.
    #[inline]
    #[must_use]
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Automation extension, as a directory or an `.xpi`.
    #[inline]
    #[must_use]
    pub fn extension(mut self, path: impl Into<PathBuf>) -> Self {
        self.extension = Some(path.into());
        self
    }

    /// Checks both paths, reads the extension manifest and starts the
    /// WebSocket server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a path is unset or the extension is missing
    /// - [`Error::FirefoxNotFound`] if the binary does not exist
    /// - [`Error::Profile`] if the extension manifest is unusable
    /// - [`Error::Io`] if the server cannot bind
    pub async fn build(self) -> Result<Driver> {
        let binary = self
            .binary
            .ok_or_else(|| Error::config("Firefox binary path is required (firefox.binary)"))?;
        if !binary.exists() {
            return Err(Error::firefox_not_found(binary));
        }

        let extension = self
            .extension
            .ok_or_else(|| Error::config("Extension path is required (firefox.extension)"))?;
        let extension = Extension::resolve(extension)?;

        Driver::start(binary, extension).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::driver::profile::extensions::tests::write_unpacked;

    #[test]
    fn test_setters() {
        let builder = DriverBuilder::new()
            .binary("/usr/bin/firefox")
            .extension("./extension");
        assert_eq!(builder.binary, Some(PathBuf::from("/usr/bin/firefox")));
        assert_eq!(builder.extension, Some(PathBuf::from("./extension")));
    }

    #[tokio::test]
    async fn test_missing_binary_setting() {
        let err = DriverBuilder::new()
            .extension("./extension")
            .build()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("binary"));
    }

    #[tokio::test]
    async fn test_missing_extension_setting() {
        let binary = tempfile::NamedTempFile::new().expect("binary stand-in");
        let err = DriverBuilder::new()
            .binary(binary.path())
            .build()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Extension"));
    }

    #[tokio::test]
    async fn test_nonexistent_binary() {
        let err = DriverBuilder::new()
            .binary("/nonexistent/firefox")
            .extension("./extension")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FirefoxNotFound { .. }));
    }

    #[tokio::test]
    async fn test_nonexistent_extension() {
        let binary = tempfile::NamedTempFile::new().expect("binary stand-in");
        let err = DriverBuilder::new()
            .binary(binary.path())
            .extension("/nonexistent/extension.xpi")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_extension_without_manifest() {
        let binary = tempfile::NamedTempFile::new().expect("binary stand-in");
        let extension = tempfile::tempdir().expect("extension dir");
        let err = DriverBuilder::new()
            .binary(binary.path())
            .extension(extension.path())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Profile { .. }));
    }

    #[tokio::test]
    async fn test_build_starts_server() {
        let binary = tempfile::NamedTempFile::new().expect("binary stand-in");
        let extension = tempfile::tempdir().expect("extension dir");
        write_unpacked(extension.path());

        let driver = DriverBuilder::new()
            .binary(binary.path())
            .extension(extension.path())
            .build()
            .await
            .expect("driver");

        assert!(driver.port() > 0);
        assert_eq!(driver.window_count(), 0);
        driver.close().await.expect("close");
    }
}
