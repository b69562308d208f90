//! Commands understood by the extension.
//!
//! Each serializes to `{"method": "module.name", "params": {...}}`, which
//! [`Request`](super::Request) merges into its envelope. Only what rendering
//! needs is modelled: tab lifecycle and focus, navigation, viewport, capture,
//! script evaluation and a status check.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Command Wrapper
// ============================================================================

/// A command from any module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    BrowsingContext(BrowsingContextCommand),
    Script(ScriptCommand),
    Session(SessionCommand),
}

// ============================================================================
// BrowsingContext Commands
// ============================================================================

/// Viewport dimensions in CSS pixels, as sent to the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportParams {
    /// Width in CSS pixels.
    pub width: u32,
    /// Height in CSS pixels.
    pub height: u32,
}

/// `browsingContext.*`: tabs, navigation, viewport and capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowsingContextCommand {
    /// Navigate to URL and wait for the load event.
    #[serde(rename = "browsingContext.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },

    /// Create new tab.
    #[serde(rename = "browsingContext.newTab")]
    NewTab,

    /// Close current tab.
    #[serde(rename = "browsingContext.closeTab")]
    CloseTab,

    /// Make the tab the active one in its window.
    #[serde(rename = "browsingContext.focusTab")]
    FocusTab,

    /// Resize the tab's layout viewport, optionally overriding the
    /// device pixel ratio.
    #[serde(rename = "browsingContext.setViewport")]
    SetViewport {
        /// New viewport size.
        viewport: ViewportParams,
        /// Device pixels per CSS pixel.
        #[serde(rename = "devicePixelRatio", skip_serializing_if = "Option::is_none")]
        device_pixel_ratio: Option<f64>,
    },

    /// Capture the visible viewport.
    #[serde(rename = "browsingContext.captureScreenshot")]
    CaptureScreenshot {
        /// Image format ("png" or "jpeg").
        format: String,
        /// JPEG quality (0-100).
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
    },
}

// ============================================================================
// Script Commands
// ============================================================================

/// `script.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ScriptCommand {
    /// Execute synchronous script. The script uses `return` for its value.
    #[serde(rename = "script.evaluate")]
    Evaluate {
        /// JavaScript code.
        script: String,
        /// Script arguments.
        #[serde(default)]
        args: Vec<Value>,
    },
}

// ============================================================================
// Session Commands
// ============================================================================

/// `session.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum SessionCommand {
    /// Liveness check; the reply content is informational.
    #[serde(rename = "session.status")]
    Status,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browsing_context_navigate() {
        let cmd = BrowsingContextCommand::Navigate {
            url: "file:///tmp/gs2imgx-1/Sheet1.html".to_string(),
        };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(json.contains("browsingContext.navigate"));
        assert!(json.contains("file:///tmp/gs2imgx-1/Sheet1.html"));
    }

    #[test]
    fn test_set_viewport_shape() {
        let cmd = Command::BrowsingContext(BrowsingContextCommand::SetViewport {
            viewport: ViewportParams {
                width: 2100,
                height: 1080,
            },
            device_pixel_ratio: Some(2.0),
        });
        let value = serde_json::to_value(&cmd).expect("serialize");
        assert_eq!(value["method"], "browsingContext.setViewport");
        assert_eq!(value["params"]["viewport"]["width"], 2100);
        assert_eq!(value["params"]["devicePixelRatio"], 2.0);
    }

    #[test]
    fn test_set_viewport_omits_ratio_when_unset() {
        let cmd = BrowsingContextCommand::SetViewport {
            viewport: ViewportParams {
                width: 1920,
                height: 1080,
            },
            device_pixel_ratio: None,
        };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(!json.contains("devicePixelRatio"));
    }

    #[test]
    fn test_capture_screenshot_png_has_no_quality() {
        let cmd = BrowsingContextCommand::CaptureScreenshot {
            format: "png".to_string(),
            quality: None,
        };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(json.contains("browsingContext.captureScreenshot"));
        assert!(!json.contains("quality"));
    }

    #[test]
    fn test_focus_tab_has_no_params() {
        let value = serde_json::to_value(Command::BrowsingContext(BrowsingContextCommand::FocusTab))
            .expect("serialize");
        assert_eq!(value["method"], "browsingContext.focusTab");
        assert!(value.get("params").is_none());
    }

    #[test]
    fn test_script_evaluate() {
        let cmd = ScriptCommand::Evaluate {
            script: "return 1".to_string(),
            args: vec![],
        };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(json.contains("script.evaluate"));
    }
}
