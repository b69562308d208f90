//! Read-only layout queries.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::Tab;
use super::script::js_literal;

// ============================================================================
// BoundingBox
// ============================================================================

/// An element's `getBoundingClientRect()`, in CSS pixels relative to the
/// viewport's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

// ============================================================================
// Tab - Layout
// ============================================================================

impl Tab {
    /// Returns the bounding box of the first element matching `selector`,
    /// or `None` if nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptError`] if the query throws or returns an
    /// unexpected shape.
    pub async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>> {
        let script = format!(
            "const el = document.querySelector({});\n\
             if (!el) return null;\n\
             const r = el.getBoundingClientRect();\n\
             return {{ x: r.x, y: r.y, width: r.width, height: r.height }};",
            js_literal(selector)
        );

        let value = self.execute_script(&script).await?;
        if value.is_null() {
            debug!(tab_id = %self.id, selector, "No element matched");
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::script_error(format!("Malformed bounding box for {selector}: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::BoundingBox;

    #[test]
    fn test_bounding_box_from_rect_json() {
        let value = serde_json::json!({"x": 0.5, "y": 24, "width": 1000, "height": 300.25});
        let bb: BoundingBox = serde_json::from_value(value).expect("parse");
        assert_eq!(
            bb,
            BoundingBox {
                x: 0.5,
                y: 24.0,
                width: 1000.0,
                height: 300.25
            }
        );
    }
}
