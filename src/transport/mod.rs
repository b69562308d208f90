//! WebSocket transport layer.
//!
//! Communication between the local end (Rust) and the remote end (the
//! automation extension running inside Firefox).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Tab (Rust)     │                              │  Extension      │
//! │                 │         WebSocket            │  (Background)   │
//! │  ConnectionPool │◄────────────────────────────►│                 │
//! │  → Connection   │      localhost:PORT          │  WebSocket      │
//! │                 │                              │  Client         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `ConnectionPool::new` binds localhost on a random port
//! 2. Firefox launches with the extension and the WebSocket URL
//! 3. The extension connects and sends READY with its session id
//! 4. `ConnectionPool::wait_for_session` hands the READY data to the launcher,
//!    whether READY arrived before or after the call
//! 5. Tabs send commands through the pool, routed by session
//! 6. `ConnectionPool::remove` shuts the connection down when the window closes
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `pool` | Session-keyed connection pool and accept loop |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Connection pool keyed by session.
pub mod pool;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, MAX_PENDING_REQUESTS, ReadyData};
pub use pool::ConnectionPool;
