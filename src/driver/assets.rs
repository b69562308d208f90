//! Initial page that bootstraps the extension connection.
//!
//! # Connection Flow
//!
//! 1. Firefox opens the data URI as its first page
//! 2. The page posts a `WEBDRIVER_INIT` message to itself
//! 3. The extension's content script forwards it to the background script
//! 4. The background script connects to the WebSocket URL and sends READY

// ============================================================================
// Imports
// ============================================================================

use serde_json::json;

use crate::identifiers::SessionId;

// ============================================================================
// Constants
// ============================================================================

/// Minimal page; only the posted message matters.
const INIT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>sheets2img</title></head>
<body>
<p>session $SESSION_ID connecting to $WS_URL</p>
<script>window.postMessage($CONFIG_JSON, '*');</script>
</body>
</html>"#;

// ============================================================================
// Public Functions
// ============================================================================

/// Builds the `data:text/html,...` URI passed to Firefox on the command line.
#[must_use]
pub fn build_init_data_uri(ws_url: &str, session_id: &SessionId) -> String {
    let config_json = json!({
        "type": "WEBDRIVER_INIT",
        "wsUrl": ws_url,
        "sessionId": session_id.as_u32(),
    })
    .to_string();

    let html = INIT_HTML_TEMPLATE
        .replace("$WS_URL", ws_url)
        .replace("$SESSION_ID", &session_id.to_string())
        .replace("$CONFIG_JSON", &config_json);

    format!("data:text/html,{}", urlencoding::encode(&html))
}

// ============================================================================
// Tests
// ============================================================================
