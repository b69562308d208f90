//! Per-job browser tabs.
//!
//! A render job opens a [`Tab`], sizes it, loads one exported sheet, measures
//! it and captures the data region:
//!
//! ```ignore
//! let tab = window.new_tab().await?;
//! tab.set_viewport(1920, 1080, Some(2.0)).await?;
//! tab.goto("file:///tmp/gs2imgx-1/Sheet1.html", &cancel).await?;
//! if let Some(body) = tab.bounding_box("tbody").await? {
//!     tab.capture_clip(&body, ImageFormat::Png, Path::new("Sheet1.png")).await?;
//! }
//! tab.close().await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod layout;
mod navigation;
mod screenshot;
mod script;
mod viewport;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Tab;
pub use layout::BoundingBox;
pub use screenshot::ImageFormat;
