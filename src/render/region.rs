//! Data region location.
//!
//! A rendered sheet page has a frozen row-header column on the left of the
//! table body. The region is the body rectangle with that column (and its
//! 1px border) cut off.

use tracing::debug;

use crate::browser::BoundingBox;
use crate::error::{Error, Result};

use super::backend::RenderPage;

// ============================================================================
// Constants
// ============================================================================

/// Selector of the frozen row-header column.
pub const HEADER_SELECTOR: &str = ".row-header-wrapper";

/// Selector of the table body.
pub const BODY_SELECTOR: &str = "tbody";

/// Border between the header column and the first data column.
const HEADER_BORDER: f64 = 1.0;

// ============================================================================
// Region
// ============================================================================

/// The page rectangle to capture, in CSS pixels.
///
/// Always has finite coordinates and positive width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Region {
    /// Derives the region from the header and body bounding boxes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Layout`] if the result is empty or not finite.
    pub fn from_layout(header: &BoundingBox, body: &BoundingBox) -> Result<Self> {
        let region = Self {
            x: body.x + header.width + HEADER_BORDER,
            y: body.y,
            width: body.width - header.width - HEADER_BORDER,
            height: body.height,
        };

        let finite = [region.x, region.y, region.width, region.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || region.width <= 0.0 || region.height <= 0.0 {
            return Err(Error::layout(format!("Degenerate data region {region:?}")));
        }

        Ok(region)
    }

    /// Returns the region as a screenshot clip.
    #[inline]
    #[must_use]
    pub fn as_clip(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

// ============================================================================
// locate
// ============================================================================

/// Measures the data region of a loaded page.
///
/// Only read-only layout queries are issued.
///
/// # Errors
///
/// Returns [`Error::Layout`] if the header or body element is missing or
/// the region is degenerate. Query failures propagate unchanged.
pub async fn locate<P>(page: &P) -> Result<Region>
where
    P: RenderPage + ?Sized,
{
    let header = page
        .bounding_box(HEADER_SELECTOR)
        .await?
        .ok_or_else(|| Error::layout(format!("Missing {HEADER_SELECTOR}")))?;
    let body = page
        .bounding_box(BODY_SELECTOR)
        .await?
        .ok_or_else(|| Error::layout(format!("Missing {BODY_SELECTOR}")))?;

    let region = Region::from_layout(&header, &body)?;
    debug!(?header, ?body, ?region, "Located data region");
    Ok(region)
}

// ============================================================================
// Tests
// ============================================================================
