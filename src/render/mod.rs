//! Tab rendering.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `selector` | Include/exclude filtering of tab identifiers |
//! | `region` | Data region location on a rendered page |
//! | `viewport` | Viewport sizing for a region |
//! | `backend` | Backend seam and the Firefox implementation |
//! | `scheduler` | Semaphore-bounded concurrent render jobs |

// ============================================================================
// Submodules
// ============================================================================

pub mod backend;
pub mod region;
pub mod scheduler;
pub mod selector;
pub mod viewport;

// ============================================================================
// Re-exports
// ============================================================================

pub use backend::{FirefoxBackend, FirefoxSettings, RenderBackend, RenderPage};
pub use region::{Region, locate};
pub use scheduler::{
    MAX_CONCURRENCY, RenderFailure, RenderReport, RenderSettings, Scheduler, SheetTab,
};
pub use selector::{Selection, select};
pub use viewport::Viewport;
