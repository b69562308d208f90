//! sheets2img - Render every tab of a spreadsheet export to a cropped image.
//!
//! The run downloads the spreadsheet's zip export, extracts one HTML page per
//! tab, loads each page in headless Firefox, measures the data region below
//! and right of the frozen headers, and writes a screenshot of exactly that
//! region.
//!
//! # Architecture
//!
//! - **Archive**: HTTP download into `gs2imgz-*`, extraction into `gs2imgx-*`
//! - **Render**: tab selection, region location, viewport sizing and a
//!   semaphore-bounded scheduler, all written against a backend trait
//! - **Driver**: launches Firefox with a temporary profile and an automation
//!   extension that connects back over a localhost WebSocket
//!
//! Each render job owns one browser tab from open to close. Jobs share one
//! Firefox process; at most `concurrency` run at once.
//!
//! # Quick Start
//!
//! ```no_run
//! use sheets2img::{Config, FirefoxBackend, HttpFetcher, Pipeline, Result};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load("config/default.json")?;
//!     let fetcher = HttpFetcher::new(config.gsheets2img.export_url.clone())?;
//!     let firefox = config.firefox_settings();
//!
//!     let report = Pipeline::new(config, fetcher)
//!         .run(|| FirefoxBackend::launch(&firefox), &CancellationToken::new())
//!         .await?;
//!
//!     println!("{} rendered, {} failed", report.rendered.len(), report.failed.len());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`archive`] | Export download, extraction, tab listing |
//! | [`browser`] | Browser entities: [`Window`], [`Tab`] |
//! | [`config`] | JSON configuration and environment overrides |
//! | [`driver`] | Firefox process and profile management |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`pipeline`] | End-to-end orchestration |
//! | [`protocol`] | WebSocket message types (internal) |
//! | [`render`] | Selection, region, viewport, scheduler |
//! | [`transport`] | WebSocket transport layer (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Export download and extraction.
pub mod archive;

/// Browser entities: Window, Tab.
pub mod browser;

/// Run configuration.
pub mod config;

/// Firefox process and profile management.
///
/// Use [`Driver::builder()`] to create a configured driver instance.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for browser entities.
pub mod identifiers;

/// End-to-end orchestration.
pub mod pipeline;

/// WebSocket protocol message types.
pub mod protocol;

/// Tab rendering.
pub mod render;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Archive types
pub use archive::{ArchiveFetcher, ArchiveSource, HttpFetcher};

// Browser types
pub use browser::{BoundingBox, ImageFormat, Tab, Window};

// Configuration
pub use config::Config;

// Driver types
pub use driver::{Driver, DriverBuilder, Extension, FirefoxOptions};

// Error types
pub use error::{Error, Result, Scope};

// Identifier types
pub use identifiers::{FrameId, RequestId, SessionId, TabId};

// Pipeline
pub use pipeline::Pipeline;

// Render types
pub use render::{
    FirefoxBackend, FirefoxSettings, Region, RenderBackend, RenderPage, RenderReport,
    RenderSettings, Scheduler, Selection, SheetTab, Viewport,
};
