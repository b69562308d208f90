//! Firefox launcher and window registry.
//!
//! A [`Driver`] owns the WebSocket server that every Firefox it launches
//! connects back to. Spawning a window goes through four steps:
//!
//! 1. build a throwaway profile with the render preferences and extension
//! 2. start Firefox on an init page that carries the session id
//! 3. wait for the extension's READY on the pool
//! 4. register the [`Window`] so [`Driver::close`] can reach it

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::browser::Window;
use crate::error::{Error, Result};
use crate::identifiers::{SessionId, TabId};
use crate::transport::ConnectionPool;

use super::assets;
use super::builder::DriverBuilder;
use super::options::FirefoxOptions;
use super::profile::{Extension, Profile};

// ============================================================================
// Driver
// ============================================================================

pub(crate) struct DriverInner {
    binary: PathBuf,
    extension: Extension,
    pool: Arc<ConnectionPool>,
    windows: Mutex<FxHashMap<SessionId, Window>>,
}

/// Firefox launcher.
///
/// Clones share the server and the window registry.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<DriverInner>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("binary", &self.inner.binary)
            .field("extension", &self.inner.extension.id())
            .field("port", &self.port())
            .field("windows", &self.window_count())
            .finish()
    }
}

impl Driver {
    /// Starts configuring a driver.
    #[inline]
    #[must_use]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Starts the WebSocket server. Inputs are already validated.
    pub(crate) async fn start(binary: PathBuf, extension: Extension) -> Result<Self> {
        let pool = ConnectionPool::new().await?;
        info!(
            port = pool.port(),
            extension = extension.id(),
            "Driver started"
        );

        Ok(Self {
            inner: Arc::new(DriverInner {
                binary,
                extension,
                pool,
                windows: Mutex::new(FxHashMap::default()),
            }),
        })
    }

    /// Number of windows not yet closed.
    #[inline]
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.inner.windows.lock().len()
    }

    /// Port of the WebSocket server.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.pool.port()
    }
}

// ============================================================================
// Driver - Windows
// ============================================================================

impl Driver {
    /// Launches a Firefox process and waits for its extension to connect.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::Profile`] if the profile cannot be prepared
    /// - [`Error::ProcessLaunchFailed`] if Firefox fails to start
    /// - [`Error::ConnectionTimeout`] if the extension never connects
    pub async fn spawn_window(&self, options: FirefoxOptions) -> Result<Window> {
        options.validate()?;
        let profile = Profile::for_render(&self.inner.extension)?;

        let session_id = SessionId::next();
        let init_page = assets::build_init_data_uri(&self.inner.pool.ws_url(), &session_id);

        let mut child = launch(&self.inner.binary, profile.path(), &options, &init_page)?;
        info!(pid = child.id(), %session_id, "Firefox started");

        let ready = match self.inner.pool.wait_for_session(session_id).await {
            Ok(ready) => ready,
            Err(e) => {
                warn!(%session_id, error = %e, "Extension did not connect");
                if let Err(kill) = child.kill().await {
                    debug!(error = %kill, "Could not kill Firefox");
                }
                return Err(e);
            }
        };

        let Some(tab_id) = TabId::new(ready.tab_id) else {
            self.inner.pool.remove(session_id);
            return Err(Error::protocol("READY carried tab id 0"));
        };

        let window = Window::new(
            Arc::clone(&self.inner.pool),
            child,
            profile,
            session_id,
            tab_id,
        );
        let open = {
            let mut windows = self.inner.windows.lock();
            windows.insert(session_id, window.clone());
            windows.len()
        };

        info!(%session_id, open, "Window ready");
        Ok(window)
    }

    /// Closes every window, then stops the server.
    ///
    /// A window that fails to close is logged and skipped.
    pub async fn close(&self) -> Result<()> {
        let windows: Vec<Window> = self
            .inner
            .windows
            .lock()
            .drain()
            .map(|(_, window)| window)
            .collect();

        info!(windows = windows.len(), "Closing driver");
        for window in windows {
            if let Err(e) = window.close().await {
                debug!(error = %e, "Window close failed");
            }
        }

        self.inner.pool.shutdown().await;
        Ok(())
    }
}

/// Starts Firefox on `profile` with `init_page` as its first URL.
fn launch(
    binary: &Path,
    profile: &Path,
    options: &FirefoxOptions,
    init_page: &str,
) -> Result<Child> {
    Command::new(binary)
        .arg("--profile")
        .arg(profile)
        .args(["--no-remote", "--new-instance"])
        .args(options.to_args())
        .arg(init_page)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(Error::process_launch_failed)
}

// ============================================================================
// Tests
// ============================================================================
