//! Viewport sizing.

use std::fmt;

use super::region::Region;

// ============================================================================
// Viewport
// ============================================================================

/// A viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Viewport {
    /// Viewport every page opens with.
    pub const BASELINE: Self = Self {
        width: 1920,
        height: 1080,
    };

    /// Room left past the region on each axis.
    pub const MARGIN: u32 = 100;

    /// Returns a viewport large enough to lay out `region` without
    /// scrolling or compression.
    ///
    /// Each axis is `max(baseline, floor(extent) + MARGIN)`.
    #[must_use]
    pub fn covering(region: &Region) -> Self {
        Self {
            width: axis(Self::BASELINE.width, region.width),
            height: axis(Self::BASELINE.height, region.height),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::BASELINE
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn axis(baseline: u32, extent: f64) -> u32 {
    // Float-to-int casts saturate.
    let needed = (extent.floor() as u32).saturating_add(Viewport::MARGIN);
    baseline.max(needed)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn region(width: f64, height: f64) -> Region {
        Region {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    #[test]
    fn test_small_region_keeps_baseline() {
        assert_eq!(Viewport::covering(&region(900.0, 500.0)), Viewport::BASELINE);
    }

    #[test]
    fn test_wide_region_grows_width() {
        let vp = Viewport::covering(&region(2000.0, 500.0));
        assert_eq!(vp.width, 2100);
        assert_eq!(vp.height, 1080);
    }

    #[test]
    fn test_fractional_extent_is_floored() {
        let vp = Viewport::covering(&region(1900.9, 3000.5));
        assert_eq!(vp.width, 2000);
        assert_eq!(vp.height, 3100);
    }

    #[test]
    fn test_display() {
        assert_eq!(Viewport::BASELINE.to_string(), "1920x1080");
    }
}
