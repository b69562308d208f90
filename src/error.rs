//! Crate-wide error type.
//!
//! Errors fall into three scopes, reported by [`Error::scope`]:
//!
//! | Scope | Variants | Effect |
//! |-------|----------|--------|
//! | [`Scope::Run`] | `Fetch`, `Extraction`, `Config`, `Profile`, `FirefoxNotFound`, `ProcessLaunchFailed` | The run aborts |
//! | [`Scope::Tab`] | `Layout`, `Capture` | One tab fails, siblings continue |
//! | [`Scope::Transport`] | everything else | Decided by the caller |

use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{RequestId, SessionId};

/// Result alias over [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Error
// ============================================================================

/// Every failure the crate reports.
#[derive(Error, Debug)]
pub enum Error {
    // ---- run ----
    /// The spreadsheet export could not be downloaded.
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    /// The downloaded archive is corrupt or unreadable.
    #[error("Extraction failed: {message}")]
    Extraction { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A throwaway profile or the extension inside it could not be set up.
    #[error("Profile error: {message}")]
    Profile { message: String },

    #[error("Firefox not found at: {path}")]
    FirefoxNotFound { path: PathBuf },

    #[error("Failed to launch Firefox: {message}")]
    ProcessLaunchFailed { message: String },

    // ---- tab ----
    /// The page lacks the header or body element, or they measure as empty.
    #[error("Layout error: {message}")]
    Layout { message: String },

    /// The screenshot could not be captured, cropped or written.
    #[error("Capture failed: {message}")]
    Capture { message: String },

    // ---- transport ----
    /// A script threw inside the page, or returned something unusable.
    #[error("Script error: {message}")]
    ScriptError { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// The extension did not connect or send READY in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout { timeout_ms: u64 },

    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed traffic, or an error reply from the extension.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: SessionId },

    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        request_id: RequestId,
        timeout_ms: u64,
    },

    /// Abandoned because the run's cancellation token fired.
    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// A reply channel was dropped before answering.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

/// How far an [`Error`] reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Aborts the whole run.
    Run,
    /// Fails one tab's render job.
    Tab,
    /// Connection or protocol trouble; the caller decides.
    Transport,
}

// ============================================================================
// Constructors
// ============================================================================

macro_rules! message_constructors {
    ($($(#[$meta:meta])* $name:ident => $variant:ident;)*) => {
        impl Error {
            $(
                $(#[$meta])*
                #[inline]
                pub fn $name(message: impl Into<String>) -> Self {
                    Self::$variant { message: message.into() }
                }
            )*
        }
    };
}

message_constructors! {
    fetch => Fetch;
    extraction => Extraction;
    config => Config;
    profile => Profile;
    layout => Layout;
    capture => Capture;
    script_error => ScriptError;
    connection => Connection;
    /// Also used for error replies, formatted `code: message`.
    protocol => Protocol;
}

impl Error {
    #[inline]
    pub fn firefox_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FirefoxNotFound { path: path.into() }
    }

    #[inline]
    pub fn process_launch_failed(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    #[inline]
    pub fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }

    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

impl Error {
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::Fetch { .. }
            | Self::Extraction { .. }
            | Self::Config { .. }
            | Self::Profile { .. }
            | Self::FirefoxNotFound { .. }
            | Self::ProcessLaunchFailed { .. } => Scope::Run,
            Self::Layout { .. } | Self::Capture { .. } => Scope::Tab,
            _ => Scope::Transport,
        }
    }

    /// Whether the error aborts the run.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.scope() == Scope::Run
    }

    /// Whether the error is confined to one tab.
    #[inline]
    #[must_use]
    pub fn is_per_tab(&self) -> bool {
        self.scope() == Scope::Tab
    }

    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Whether the socket to the extension is unusable.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::layout("missing .row-header-wrapper").to_string(),
            "Layout error: missing .row-header-wrapper"
        );
        assert_eq!(Error::fetch("HTTP 404").to_string(), "Fetch failed: HTTP 404");
        assert_eq!(
            Error::firefox_not_found("/opt/ff").to_string(),
            "Firefox not found at: /opt/ff"
        );
    }

    #[test]
    fn test_scope() {
        assert_eq!(Error::fetch("down").scope(), Scope::Run);
        assert_eq!(Error::extraction("bad zip").scope(), Scope::Run);
        assert_eq!(Error::config("concurrency").scope(), Scope::Run);
        assert_eq!(Error::layout("x").scope(), Scope::Tab);
        assert_eq!(Error::capture("x").scope(), Scope::Tab);
        assert_eq!(Error::Cancelled.scope(), Scope::Transport);
        assert_eq!(Error::ConnectionClosed.scope(), Scope::Transport);
    }

    #[test]
    fn test_predicates_follow_scope() {
        assert!(Error::fetch("x").is_fatal());
        assert!(!Error::fetch("x").is_per_tab());
        assert!(Error::capture("x").is_per_tab());
        assert!(!Error::Cancelled.is_fatal());
        assert!(Error::Cancelled.is_cancelled());
    }

    #[test]
    fn test_transport_predicates() {
        assert!(Error::connection_timeout(5000).is_timeout());
        assert!(Error::connection_timeout(5000).is_connection_error());
        assert!(!Error::connection("refused").is_timeout());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("x").is_connection_error());
    }

    #[test]
    fn test_from_conversions() {
        let err: Error = IoError::new(ErrorKind::NotFound, "file not found").into();
        assert!(matches!(err, Error::Io(_)));

        let err: Error = serde_json::from_str::<String>("invalid")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Json(_)));
    }
}
