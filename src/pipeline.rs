//! End-to-end run.
//!
//! fetch → extract → list → select → create output dir → launch browser →
//! render → shut browser down → remove extraction dir.
//!
//! The browser is only launched when at least one tab is selected. Both
//! the browser and the temporary directories are released exactly once,
//! best effort, whatever the render outcome.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::archive::{self, ArchiveFetcher, ArchiveSource};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::render::{RenderBackend, RenderReport, RenderSettings, Scheduler, SheetTab, select};

// ============================================================================
// Pipeline
// ============================================================================

/// Orchestrates one full run.
pub struct Pipeline<F> {
    config: Config,
    fetcher: F,
}

impl<F: ArchiveFetcher> Pipeline<F> {
    /// Creates a pipeline from a validated configuration.
    #[must_use]
    pub fn new(config: Config, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the pipeline.
    ///
    /// `launch` is called at most once, only if some tab is selected.
    ///
    /// # Errors
    ///
    /// Returns fatal errors only: configuration, fetch, extraction, output
    /// directory creation, browser launch, or cancellation before
    /// rendering started. Per-tab failures are in the report.
    pub async fn run<B, L, Fut>(&self, launch: L, cancel: &CancellationToken) -> Result<RenderReport>
    where
        B: RenderBackend,
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<B>>,
    {
        let settings = self.config.render_settings()?;
        settings.validate()?;

        let sheet_id = &self.config.gsheets2img.sheet_id;
        let download = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            download = self.fetcher.fetch(sheet_id) => download?,
        };

        let source = archive::extract(download).await?;
        info!(dir = %source.dir().display(), "Archive extracted");

        let result = self.render(&source, settings, launch, cancel).await;

        let dir = source.dir().to_path_buf();
        if let Err(e) = source.close() {
            warn!(dir = %dir.display(), error = %e, "Failed to remove extraction directory");
        }
        result
    }

    async fn render<B, L, Fut>(
        &self,
        source: &ArchiveSource,
        settings: RenderSettings,
        launch: L,
        cancel: &CancellationToken,
    ) -> Result<RenderReport>
    where
        B: RenderBackend,
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<B>>,
    {
        let ids = source.list().await?;
        let selected = select(&ids, &self.config.selection());
        info!(available = ids.len(), selected = selected.len(), "Tabs selected");

        let output_dir = &self.config.gsheets2img.output_dir;
        tokio::fs::create_dir_all(output_dir).await?;

        if selected.is_empty() {
            info!("Nothing to render");
            return Ok(RenderReport::default());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let tabs = sheet_tabs(source, output_dir, selected, &settings);
        let backend = Arc::new(launch().await?);

        let report = match Scheduler::new(Arc::clone(&backend), settings) {
            Ok(scheduler) => Ok(scheduler.run(tabs, cancel).await),
            Err(e) => Err(e),
        };

        if let Err(e) = backend.shutdown().await {
            warn!(error = %e, "Browser shutdown failed");
        }
        report
    }
}

fn sheet_tabs(
    source: &ArchiveSource,
    output_dir: &Path,
    ids: Vec<String>,
    settings: &RenderSettings,
) -> Vec<SheetTab> {
    let extension = settings.format.extension();
    ids.into_iter()
        .map(|id| {
            let source_path = source.load(&id);
            let output = output_dir.join(format!("{id}.{extension}"));
            SheetTab::new(id, source_path, output)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
