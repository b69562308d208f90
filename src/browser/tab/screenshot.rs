//! Clipped screenshot capture.
//!
//! The extension captures the visible viewport as a PNG; cropping to the
//! clip rectangle and re-encoding happen here, off the async runtime.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{BrowsingContextCommand, Command};

use super::Tab;
use super::layout::BoundingBox;

// ============================================================================
// ImageFormat
// ============================================================================

/// Output image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Lossless PNG.
    Png,
    /// JPEG with quality 1-100.
    Jpeg(u8),
}

impl ImageFormat {
    /// Quality used when none is configured.
    pub const DEFAULT_JPEG_QUALITY: u8 = 85;

    /// Creates JPEG format, clamping quality into 1-100.
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.clamp(1, 100))
    }

    /// Returns the file extension for this format.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpg",
        }
    }
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self::Jpeg(Self::DEFAULT_JPEG_QUALITY)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    /// Parses `png`, `jpg` or `jpeg` (any case). JPEG gets the default
    /// quality.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::default()),
            other => Err(Error::config(format!(
                "Unsupported image format '{other}' (expected jpg or png)"
            ))),
        }
    }
}

// ============================================================================
// Tab - Screenshot
// ============================================================================

impl Tab {
    /// Captures the visible viewport, crops it to `clip` and writes it to
    /// `path` in `format`.
    ///
    /// `clip` is in CSS pixels; it is scaled by the device pixel ratio the
    /// extension reports, falling back to the ratio last applied through
    /// [`Tab::set_viewport`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] if the screenshot is missing, cannot be
    /// decoded, the clip lies entirely outside it, or the file cannot be
    /// written.
    pub async fn capture_clip(
        &self,
        clip: &BoundingBox,
        format: ImageFormat,
        path: &Path,
    ) -> Result<()> {
        debug!(
            tab_id = %self.id,
            ?clip,
            %format,
            path = %path.display(),
            "Capturing clipped screenshot"
        );

        let command = Command::BrowsingContext(BrowsingContextCommand::CaptureScreenshot {
            format: "png".to_string(),
            quality: None,
        });

        let result = self.send_command(command).await?.into_result()?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::capture("Screenshot response missing data field"))?
            .to_string();
        let scale = result
            .get("scale")
            .and_then(|v| v.as_f64())
            .unwrap_or_else(|| self.device_pixel_ratio());

        let clip = *clip;
        let encoded =
            tokio::task::spawn_blocking(move || crop_and_encode(&data, &clip, scale, format))
                .await
                .map_err(|e| Error::capture(format!("Encoder task failed: {e}")))??;

        tokio::fs::write(path, &encoded).await.map_err(|e| {
            Error::capture(format!("Failed to write {}: {e}", path.display()))
        })?;

        debug!(tab_id = %self.id, bytes = encoded.len(), "Screenshot written");
        Ok(())
    }
}

// ============================================================================
// Image Processing
// ============================================================================

/// Decodes a base64 screenshot, crops it to `clip` (CSS pixels times
/// `scale`) and encodes the result.
pub(crate) fn crop_and_encode(
    data: &str,
    clip: &BoundingBox,
    scale: f64,
    format: ImageFormat,
) -> Result<Vec<u8>> {
    let bytes = Base64Standard
        .decode(data)
        .map_err(|e| Error::capture(format!("Failed to decode base64: {e}")))?;

    let img = image::load_from_memory(&bytes)
        .map_err(|e| Error::capture(format!("Failed to load image: {e}")))?;

    let (x, y, width, height) = crop_rect(clip, scale, img.dimensions())
        .ok_or_else(|| Error::capture(format!("Clip {clip:?} lies outside the screenshot")))?;

    encode(&img.crop_imm(x, y, width, height), format)
}

/// Converts a CSS-pixel clip into a device-pixel crop clamped to the image.
///
/// Returns `None` when nothing of the clip remains inside the image.
pub(crate) fn crop_rect(
    clip: &BoundingBox,
    scale: f64,
    (img_width, img_height): (u32, u32),
) -> Option<(u32, u32, u32, u32)> {
    let to_device = |v: f64, limit: u32| -> u32 {
        let px = v * scale;
        if px.is_nan() || px <= 0.0 {
            0
        } else {
            (px as u64).min(u64::from(limit)) as u32
        }
    };

    let left = to_device(clip.x.floor(), img_width);
    let top = to_device(clip.y.floor(), img_height);
    let right = to_device((clip.x + clip.width).ceil(), img_width);
    let bottom = to_device((clip.y + clip.height).ceil(), img_height);

    (right > left && bottom > top).then(|| (left, top, right - left, bottom - top))
}

/// Encodes an image in the requested format.
pub(crate) fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Vec::new();

    match format {
        ImageFormat::Png => img
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| Error::capture(format!("Failed to encode PNG: {e}")))?,
        ImageFormat::Jpeg(quality) => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                .map_err(|e| Error::capture(format!("Failed to encode JPEG: {e}")))?;
        }
    }

    Ok(buf)
}

// ============================================================================
// Tests
// ============================================================================
