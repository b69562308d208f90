//! Loading, focusing and closing pages.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{BrowsingContextCommand, Command};

use super::Tab;

impl Tab {
    /// Loads `url` and resolves once the page's load event fired.
    ///
    /// No timeout applies; a large sheet may take long to lay out. Firing
    /// `cancel` ends the wait with [`Error::Cancelled`](crate::Error::Cancelled).
    ///
    /// # Errors
    ///
    /// Navigation failures reported by the extension, a dropped connection,
    /// or cancellation.
    pub async fn goto(&self, url: &str, cancel: &CancellationToken) -> Result<()> {
        debug!(tab_id = %self.id, url, "Loading page");
        let navigate = Command::BrowsingContext(BrowsingContextCommand::Navigate {
            url: url.to_owned(),
        });
        self.send_command_cancellable(navigate, cancel)
            .await?
            .into_result()
            .map(drop)
    }

    /// Makes this the active tab of its window.
    ///
    /// Viewport changes and screenshots act on whatever tab is in front, so
    /// callers sharing a window must hold it in front across both.
    pub async fn focus(&self) -> Result<()> {
        debug!(tab_id = %self.id, "Focusing tab");
        self.send_command(Command::BrowsingContext(BrowsingContextCommand::FocusTab))
            .await?
            .into_result()
            .map(drop)
    }

    /// Closes the tab. The handle is unusable afterwards.
    pub async fn close(&self) -> Result<()> {
        debug!(tab_id = %self.id, "Closing tab");
        self.send_command(Command::BrowsingContext(BrowsingContextCommand::CloseTab))
            .await?
            .into_result()
            .map(drop)
    }
}
