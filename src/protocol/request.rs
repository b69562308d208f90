//! Envelopes around [`Command`]s.
//!
//! ```json
//! → {"id": "…", "tabId": 1, "frameId": 0, "method": "script.evaluate", "params": {…}}
//! ← {"id": "…", "type": "success", "result": {…}}
//! ← {"id": "…", "type": "error", "error": "no such frame", "message": "…"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, RequestId, TabId};

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// Outgoing command addressed to a tab and frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Correlates the reply.
    pub id: RequestId,
    pub tab_id: TabId,
    pub frame_id: FrameId,
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Wraps `command` under a fresh id.
    #[inline]
    #[must_use]
    pub fn new(tab_id: TabId, frame_id: FrameId, command: Command) -> Self {
        Self {
            id: RequestId::generate(),
            tab_id,
            frame_id,
            command,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// Reply from the extension. READY arrives in the same shape.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Id of the request being answered.
    pub id: RequestId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// What the extension made of a request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    Success {
        #[serde(default)]
        result: Value,
    },
    Error {
        /// Short error code.
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl Response {
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// The result payload, `Null` when the extension sent none.
    ///
    /// # Errors
    ///
    /// An error reply becomes [`Error::Protocol`] with `code: message`.
    pub fn into_result(self) -> Result<Value> {
        match self.outcome {
            Outcome::Success { result } => Ok(result),
            Outcome::Error { error, message } => {
                let code = error.unwrap_or_else(|| "unknown error".to_owned());
                let message = message.unwrap_or_else(|| code.clone());
                Err(Error::protocol(format!("{code}: {message}")))
            }
        }
    }

    /// Unsigned integer field of a success payload, 0 when absent.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        match &self.outcome {
            Outcome::Success { result } => result.get(key).and_then(Value::as_u64).unwrap_or(0),
            Outcome::Error { .. } => 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
