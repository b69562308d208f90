//! Viewport control.

use tracing::debug;

use crate::error::Result;
use crate::protocol::{BrowsingContextCommand, Command, ViewportParams};

use super::Tab;

// ============================================================================
// Tab - Viewport
// ============================================================================

impl Tab {
    /// Resizes the layout viewport to `width` x `height` CSS pixels.
    ///
    /// When `device_pixel_ratio` is `Some`, it also overrides the ratio and
    /// remembers it for later screenshot cropping. `None` keeps the current
    /// ratio.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension rejects the resize.
    pub async fn set_viewport(
        &self,
        width: u32,
        height: u32,
        device_pixel_ratio: Option<f64>,
    ) -> Result<()> {
        debug!(
            tab_id = %self.id,
            width,
            height,
            ?device_pixel_ratio,
            "Setting viewport"
        );

        let command = Command::BrowsingContext(BrowsingContextCommand::SetViewport {
            viewport: ViewportParams { width, height },
            device_pixel_ratio,
        });

        self.send_command(command).await?.into_result()?;

        if let Some(ratio) = device_pixel_ratio {
            *self.device_pixel_ratio.lock() = ratio;
        }
        Ok(())
    }
}
