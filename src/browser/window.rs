//! One Firefox process and its session.
//!
//! A [`Window`] keeps three things alive together: the child process, the
//! throwaway profile it runs on, and its session in the pool. Dropping the
//! last clone kills the process (it is spawned with `kill_on_drop`) and
//! deletes the profile.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::process::Child;
use tracing::{debug, info};

use crate::driver::Profile;
use crate::error::{Error, Result};
use crate::identifiers::{FrameId, SessionId, TabId};
use crate::protocol::{BrowsingContextCommand, Command, Request, Response, SessionCommand};
use crate::transport::ConnectionPool;

use super::Tab;

// ============================================================================
// Window
// ============================================================================

struct WindowInner {
    session_id: SessionId,
    pool: Arc<ConnectionPool>,
    /// `None` once closed.
    process: Mutex<Option<Child>>,
    _profile: Profile,
    /// Tab that loaded the init page; window-level commands go through it.
    home_tab: TabId,
}

/// Handle to a running Firefox. Clones share the process.
#[derive(Clone)]
pub struct Window {
    inner: Arc<WindowInner>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("session_id", &self.inner.session_id)
            .field("home_tab", &self.inner.home_tab)
            .field("running", &self.inner.process.lock().is_some())
            .finish()
    }
}

impl Window {
    pub(crate) fn new(
        pool: Arc<ConnectionPool>,
        process: Child,
        profile: Profile,
        session_id: SessionId,
        home_tab: TabId,
    ) -> Self {
        debug!(%session_id, pid = process.id(), %home_tab, "Window attached");
        Self {
            inner: Arc::new(WindowInner {
                session_id,
                pool,
                process: Mutex::new(Some(process)),
                _profile: profile,
                home_tab,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    /// Opens a fresh tab for one render job.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the reply carries no usable tab id.
    pub async fn new_tab(&self) -> Result<Tab> {
        let reply = self
            .send_command(Command::BrowsingContext(BrowsingContextCommand::NewTab))
            .await?
            .into_result()?;
        let tab_id = parse_tab_id(&reply)?;

        debug!(session_id = %self.inner.session_id, %tab_id, "Tab opened");
        Ok(Tab::new(tab_id, FrameId::main(), self.clone()))
    }

    /// `session.status`, used as a liveness check after launch.
    ///
    /// # Errors
    ///
    /// Fails if the extension does not answer or answers with an error.
    pub async fn status(&self) -> Result<Value> {
        let status = self
            .send_command(Command::Session(SessionCommand::Status))
            .await?
            .into_result()?;
        debug!(session_id = %self.inner.session_id, %status, "Session status");
        Ok(status)
    }

    /// Drops the session and kills Firefox. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.inner.pool.remove(self.inner.session_id);

        let child = self.inner.process.lock().take();
        if let Some(mut child) = child {
            let pid = child.id();
            if let Err(e) = child.kill().await {
                debug!(?pid, error = %e, "Kill failed");
            }
            info!(session_id = %self.inner.session_id, ?pid, "Window closed");
        }
        Ok(())
    }

    /// Sends through the tab that hosts the init page.
    pub(crate) async fn send_command(&self, command: Command) -> Result<Response> {
        self.send(Request::new(self.inner.home_tab, FrameId::main(), command))
            .await
    }

    /// Sends a request already addressed to one of this window's tabs.
    pub(crate) async fn send(&self, request: Request) -> Result<Response> {
        self.inner.pool.send(self.inner.session_id, request).await
    }

    pub(crate) fn pool(&self) -> &ConnectionPool {
        &self.inner.pool
    }
}

/// Reads `tabId` from a `browsingContext.newTab` reply.
fn parse_tab_id(reply: &Value) -> Result<TabId> {
    reply
        .get("tabId")
        .and_then(Value::as_u64)
        .and_then(|raw| u32::try_from(raw).ok())
        .and_then(TabId::new)
        .ok_or_else(|| Error::protocol(format!("newTab reply without a valid tabId: {reply}")))
}

// ============================================================================
// Tests
// ============================================================================
