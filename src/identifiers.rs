//! Type-safe identifiers for browser entities.
//!
//! Newtype wrappers keep the different numeric and UUID identifiers used by
//! the extension protocol from being mixed up at compile time.
//!
//! | Type | Backing | Origin |
//! |------|---------|--------|
//! | [`SessionId`] | `NonZeroU32` | Generated locally before Firefox launches |
//! | [`TabId`] | `NonZeroU32` | Assigned by Firefox |
//! | [`FrameId`] | `u64` | Assigned by Firefox (`0` = main frame) |
//! | [`RequestId`] | `Uuid` | Generated locally per request |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// SessionId
// ============================================================================

/// Next session number handed out by [`SessionId::next`].
static NEXT_SESSION: AtomicU32 = AtomicU32::new(1);

/// Identifies one browser process connected to the WebSocket pool.
///
/// The id is generated before Firefox starts and passed to the extension
/// through the init page, so the pool can route the READY handshake back to
/// the waiting launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(NonZeroU32);

impl SessionId {
    /// Returns a fresh, process-unique session id.
    #[must_use]
    pub fn next() -> Self {
        loop {
            let raw = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
            if let Some(id) = NonZeroU32::new(raw) {
                return Self(id);
            }
        }
    }

    /// Wraps a raw value received over the wire. Returns `None` for `0`.
    #[inline]
    #[must_use]
    pub fn from_u32(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TabId
// ============================================================================

/// Firefox tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(NonZeroU32);

impl TabId {
    /// Creates a tab id. Returns `None` for `0`, which Firefox never assigns.
    #[inline]
    #[must_use]
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FrameId
// ============================================================================

/// Frame identifier within a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    /// The top-level frame of a tab.
    #[inline]
    #[must_use]
    pub const fn main() -> Self {
        Self(0)
    }

    /// Returns `true` for the top-level frame.
    #[inline]
    #[must_use]
    pub const fn is_main(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Correlates a request with its response.
///
/// The nil UUID is reserved for the READY handshake the extension sends
/// right after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a random request id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id carried by the READY handshake.
    #[inline]
    #[must_use]
    pub const fn ready() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` for the READY handshake id.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_rejects_zero() {
        assert!(SessionId::from_u32(0).is_none());
        assert_eq!(SessionId::from_u32(7).map(|s| s.as_u32()), Some(7));
    }

    #[test]
    fn test_tab_id_rejects_zero() {
        assert!(TabId::new(0).is_none());
        assert_eq!(TabId::new(3).map(|t| t.as_u32()), Some(3));
    }

    #[test]
    fn test_frame_id_main() {
        assert!(FrameId::main().is_main());
        assert_eq!(FrameId::default(), FrameId::main());
    }

    #[test]
    fn test_request_id_ready_is_nil() {
        assert!(RequestId::ready().is_ready());
        assert!(!RequestId::generate().is_ready());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let tab = TabId::new(12).expect("non-zero");
        assert_eq!(serde_json::to_string(&tab).expect("serialize"), "12");

        let parsed: RequestId =
            serde_json::from_str("\"00000000-0000-0000-0000-000000000000\"").expect("parse");
        assert!(parsed.is_ready());
    }
}
