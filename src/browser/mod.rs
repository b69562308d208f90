//! Browser entities.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Window`] | One Firefox process and its session |
//! | [`Tab`] | One isolated page inside a window |
//! | [`BoundingBox`] | Element rectangle from a layout query |
//! | [`ImageFormat`] | Screenshot output encoding |

// ============================================================================
// Submodules
// ============================================================================

/// Browser tab control.
pub mod tab;

/// Browser window management.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use tab::{BoundingBox, ImageFormat, Tab};
pub use window::Window;
