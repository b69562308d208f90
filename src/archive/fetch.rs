//! Spreadsheet export download.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default export URL template.
pub const DEFAULT_EXPORT_URL: &str =
    "https://docs.google.com/spreadsheets/d/{sheetId}/export?format=zip";

/// Placeholder replaced by the sheet id.
pub const SHEET_ID_PLACEHOLDER: &str = "{sheetId}";

/// Prefix of the download directory.
pub const DOWNLOAD_DIR_PREFIX: &str = "gs2imgz-";

/// TCP connect timeout. The body itself has no deadline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Download
// ============================================================================

/// A downloaded archive in its own temporary directory.
///
/// Dropping it deletes the directory.
pub struct Download {
    dir: TempDir,
    path: PathBuf,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download").field("path", &self.path).finish()
    }
}

impl Download {
    /// Creates an empty download directory for `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the directory cannot be created.
    pub fn create(file_name: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(DOWNLOAD_DIR_PREFIX)
            .tempdir()
            .map_err(|e| Error::fetch(format!("Failed to create download directory: {e}")))?;
        let path = dir.path().join(file_name);
        Ok(Self { dir, path })
    }

    /// Returns the archive file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the download directory.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Deletes the download directory.
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
// ArchiveFetcher
// ============================================================================

/// Obtains the compressed export of a spreadsheet.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Downloads the export of `sheet_id`.
    async fn fetch(&self, sheet_id: &str) -> Result<Download>;
}

// ============================================================================
// HttpFetcher
// ============================================================================

/// Downloads exports over HTTP(S), streaming the body to disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    url_template: String,
}

impl HttpFetcher {
    /// Creates a fetcher for an export URL template containing `{sheetId}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the template lacks the placeholder, or
    /// [`Error::Fetch`] if the HTTP client cannot be built.
    pub fn new(url_template: impl Into<String>) -> Result<Self> {
        let url_template = url_template.into();
        if !url_template.contains(SHEET_ID_PLACEHOLDER) {
            return Err(Error::config(format!(
                "exportUrl must contain {SHEET_ID_PLACEHOLDER}: {url_template}"
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::fetch(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url_template,
        })
    }

    /// Returns the export URL for `sheet_id`.
    #[must_use]
    pub fn export_url(&self, sheet_id: &str) -> String {
        export_url(&self.url_template, sheet_id)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: DEFAULT_EXPORT_URL.to_string(),
        }
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, sheet_id: &str) -> Result<Download> {
        let url = self.export_url(sheet_id);
        info!(%url, "Downloading spreadsheet export");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::fetch(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(format!("{url} returned {status}")));
        }

        let download = Download::create(&format!("{sheet_id}.zip"))?;
        let mut file = tokio::fs::File::create(download.path())
            .await
            .map_err(|e| Error::fetch(format!("Failed to create archive file: {e}")))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::fetch(format!("Download interrupted: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::fetch(format!("Failed to write archive: {e}")))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::fetch(format!("Failed to write archive: {e}")))?;

        debug!(bytes = written, path = %download.path().display(), "Export downloaded");
        Ok(download)
    }
}

/// Substitutes the URL-encoded `sheet_id` into `template`.
#[must_use]
pub fn export_url(template: &str, sheet_id: &str) -> String {
    template.replace(SHEET_ID_PLACEHOLDER, &urlencoding::encode(sheet_id))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::archive::tests::zip_bytes;

    fn template(server: &MockServer) -> String {
        format!("{}/spreadsheets/d/{{sheetId}}/export?format=zip", server.uri())
    }

    #[test]
    fn test_export_url() {
        assert_eq!(
            export_url(DEFAULT_EXPORT_URL, "1AbC_d-9"),
            "https://docs.google.com/spreadsheets/d/1AbC_d-9/export?format=zip"
        );
        assert_eq!(export_url("x/{sheetId}", "a b"), "x/a%20b");
    }

    #[test]
    fn test_template_requires_placeholder() {
        let err = HttpFetcher::new("https://example.com/export").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_fetch_writes_archive() {
        let server = MockServer::start().await;
        let body = zip_bytes(&[("A.html", "<table></table>")]);
        Mock::given(method("GET"))
            .and(path("/spreadsheets/d/abc/export"))
            .and(query_param("format", "zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(template(&server)).expect("fetcher");
        let download = fetcher.fetch("abc").await.expect("fetch");

        assert!(download.path().ends_with("abc.zip"));
        let name = download
            .dir()
            .file_name()
            .and_then(|n| n.to_str())
            .expect("dir name");
        assert!(name.starts_with(DOWNLOAD_DIR_PREFIX));
        assert_eq!(std::fs::read(download.path()).expect("read"), body);

        let dir = download.dir().to_path_buf();
        download.close().expect("close");
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(template(&server)).expect("fetcher");
        let err = fetcher.fetch("missing").await.unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("404"));
    }
}
