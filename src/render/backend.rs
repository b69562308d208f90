//! Render backend abstraction.
//!
//! The scheduler and region locator are written against [`RenderBackend`]
//! and [`RenderPage`]. [`FirefoxBackend`] drives a real browser; tests and
//! benches plug in in-memory fakes.
//!
//! Pages of one backend may share a window. Resizing and capturing act on
//! the window's front page, so the scheduler brings a page to the front
//! with [`RenderPage::focus`] and keeps it there, under one lock per run,
//! until its capture is written.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::browser::{BoundingBox, ImageFormat, Tab, Window};
use crate::driver::{Driver, FirefoxOptions};
use crate::error::Result;

use super::region::Region;
use super::viewport::Viewport;

// ============================================================================
// Traits
// ============================================================================

/// One page, exclusively owned by a render job.
#[async_trait]
pub trait RenderPage: Send + Sync {
    /// Navigates and waits for load, with no deadline other than `cancel`.
    async fn goto(&self, url: &str, cancel: &CancellationToken) -> Result<()>;

    /// Brings the page to the front of its window. Pages that never share
    /// a window keep the default no-op.
    async fn focus(&self) -> Result<()> {
        Ok(())
    }

    /// Bounding box of the first element matching `selector`.
    async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>>;

    /// Resizes the viewport, keeping the device pixel ratio.
    async fn set_viewport(&self, viewport: Viewport) -> Result<()>;

    /// Captures `region` and writes it to `path`.
    async fn capture(&self, region: &Region, format: ImageFormat, path: &Path) -> Result<()>;

    /// Closes the page.
    async fn close(&self) -> Result<()>;
}

/// A shared browser that hands out pages.
#[async_trait]
pub trait RenderBackend: Send + Sync + 'static {
    /// Page type handed to render jobs.
    type Page: RenderPage + 'static;

    /// Opens a new page at `viewport` with the given device pixel ratio.
    async fn new_page(&self, viewport: Viewport, device_pixel_ratio: f64) -> Result<Self::Page>;

    /// Shuts the browser down. Called once after every job resolved.
    async fn shutdown(&self) -> Result<()>;
}

// ============================================================================
// Tab as RenderPage
// ============================================================================

#[async_trait]
impl RenderPage for Tab {
    async fn goto(&self, url: &str, cancel: &CancellationToken) -> Result<()> {
        Tab::goto(self, url, cancel).await
    }

    async fn focus(&self) -> Result<()> {
        Tab::focus(self).await
    }

    async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>> {
        Tab::bounding_box(self, selector).await
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        Tab::set_viewport(self, viewport.width, viewport.height, None).await
    }

    async fn capture(&self, region: &Region, format: ImageFormat, path: &Path) -> Result<()> {
        self.capture_clip(&region.as_clip(), format, path).await
    }

    async fn close(&self) -> Result<()> {
        Tab::close(self).await
    }
}

// ============================================================================
// FirefoxBackend
// ============================================================================

/// Firefox settings needed to launch a [`FirefoxBackend`].
#[derive(Debug, Clone)]
pub struct FirefoxSettings {
    /// Firefox executable.
    pub binary: PathBuf,
    /// Automation extension (directory or `.xpi`).
    pub extension: PathBuf,
    /// Run without a visible window.
    pub headless: bool,
}

/// One Firefox process shared by every render job.
#[derive(Debug)]
pub struct FirefoxBackend {
    driver: Driver,
    window: Window,
}

impl FirefoxBackend {
    /// Launches Firefox and waits for the extension to connect.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary or extension is invalid, the process
    /// cannot start, or the extension never connects.
    pub async fn launch(settings: &FirefoxSettings) -> Result<Self> {
        let driver = Driver::builder()
            .binary(&settings.binary)
            .extension(&settings.extension)
            .build()
            .await?;

        let mut options = FirefoxOptions::new()
            .with_window_size(Viewport::BASELINE.width, Viewport::BASELINE.height);
        if settings.headless {
            options = options.with_headless();
        }

        let window = match driver.spawn_window(options).await {
            Ok(window) => window,
            Err(e) => {
                let _ = driver.close().await;
                return Err(e);
            }
        };
        if let Err(e) = window.status().await {
            let _ = driver.close().await;
            return Err(e);
        }

        info!(
            session_id = %window.session_id(),
            headless = settings.headless,
            "Firefox backend ready"
        );
        Ok(Self { driver, window })
    }
}

#[async_trait]
impl RenderBackend for FirefoxBackend {
    type Page = Tab;

    async fn new_page(&self, viewport: Viewport, device_pixel_ratio: f64) -> Result<Tab> {
        let tab = self.window.new_tab().await?;

        let sized = async {
            tab.focus().await?;
            tab.set_viewport(viewport.width, viewport.height, Some(device_pixel_ratio))
                .await
        };
        if let Err(e) = sized.await {
            let _ = tab.close().await;
            return Err(e);
        }

        Ok(tab)
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Firefox backend");
        self.driver.close().await
    }
}
