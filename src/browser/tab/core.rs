//! The [`Tab`] handle.

use std::fmt;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::browser::Window;
use crate::error::Result;
use crate::identifiers::{FrameId, SessionId, TabId};
use crate::protocol::{Command, Request, Response};

/// Ratio Firefox renders at until a viewport override sets one.
const INITIAL_DEVICE_PIXEL_RATIO: f64 = 1.0;

/// One browser tab, owned by a single render job until [`Tab::close`].
///
/// Commands are addressed to `frame` inside the tab and routed through the
/// owning window's session.
pub struct Tab {
    pub(crate) id: TabId,
    frame: FrameId,
    window: Window,
    /// Last ratio applied by `set_viewport`.
    pub(crate) device_pixel_ratio: Mutex<f64>,
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("id", &self.id)
            .field("frame", &self.frame)
            .field("session_id", &self.session_id())
            .finish()
    }
}

impl Tab {
    pub(crate) fn new(id: TabId, frame: FrameId, window: Window) -> Self {
        Self {
            id,
            frame,
            window,
            device_pixel_ratio: Mutex::new(INITIAL_DEVICE_PIXEL_RATIO),
        }
    }

    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.window.session_id()
    }

    /// Device pixel ratio last applied to this tab.
    #[inline]
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f64 {
        *self.device_pixel_ratio.lock()
    }

    pub(crate) async fn send_command(&self, command: Command) -> Result<Response> {
        self.window.send(self.request(command)).await
    }

    /// No deadline; the wait ends when `cancel` fires.
    pub(crate) async fn send_command_cancellable(
        &self,
        command: Command,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.window
            .pool()
            .send_cancellable(self.session_id(), self.request(command), cancel)
            .await
    }

    fn request(&self, command: Command) -> Request {
        Request::new(self.id, self.frame, command)
    }
}

#[cfg(test)]
mod tests {
    use super::Tab;

    #[test]
    fn test_tab_is_send_sync() {
        fn assert_traits<T: std::fmt::Debug + Send + Sync + 'static>() {}
        assert_traits::<Tab>();
    }
}
