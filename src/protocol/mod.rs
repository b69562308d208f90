//! Wire format spoken with the automation extension.
//!
//! Every message is one JSON text frame. The driver sends a [`Request`]
//! naming a `module.method` [`Command`]; the extension answers with a
//! [`Response`] carrying the same id. The extension's first frame, READY,
//! is a response to the nil id.

/// Commands by module.
pub mod command;

/// Request and response envelopes.
pub mod request;

pub use command::{BrowsingContextCommand, Command, ScriptCommand, SessionCommand, ViewportParams};
pub use request::{Outcome, Request, Response};
