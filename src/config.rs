//! Run configuration.
//!
//! Loaded from a JSON file, then environment overrides are applied, then
//! the result is validated.
//!
//! ```json
//! {
//!   "gsheets2img": {
//!     "sheetID": "1AbC...",
//!     "outputDir": "out",
//!     "includeSheets": ["Summary"],
//!     "excludeSheets": [],
//!     "concurrency": 4,
//!     "imageFormat": "jpg",
//!     "jpegQuality": 85
//!   },
//!   "firefox": {
//!     "binary": "/usr/bin/firefox",
//!     "extension": "extension",
//!     "headless": true
//!   }
//! }
//! ```
//!
//! # Environment Overrides
//!
//! | Variable | Replaces |
//! |----------|----------|
//! | `GSHEETS2IMG_SHEET_ID` | `gsheets2img.sheetID` |
//! | `GSHEETS2IMG_OUTPUT_DIR` | `gsheets2img.outputDir` |
//! | `GSHEETS2IMG_CONCURRENCY` | `gsheets2img.concurrency` |
//! | `GSHEETS2IMG_FIREFOX_BINARY` | `firefox.binary` |
//! | `GSHEETS2IMG_FIREFOX_EXTENSION` | `firefox.extension` |

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::DEFAULT_EXPORT_URL;
use crate::archive::fetch::SHEET_ID_PLACEHOLDER;
use crate::browser::ImageFormat;
use crate::error::{Error, Result};
use crate::render::scheduler::{DEFAULT_CONCURRENCY, DEVICE_PIXEL_RATIO, MAX_CONCURRENCY};
use crate::render::{FirefoxSettings, RenderSettings, Selection};

// ============================================================================
// Constants
// ============================================================================

/// Configuration file used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.json";

/// Environment variable names.
pub mod env {
    /// Overrides `gsheets2img.sheetID`.
    pub const SHEET_ID: &str = "GSHEETS2IMG_SHEET_ID";
    /// Overrides `gsheets2img.outputDir`.
    pub const OUTPUT_DIR: &str = "GSHEETS2IMG_OUTPUT_DIR";
    /// Overrides `gsheets2img.concurrency`.
    pub const CONCURRENCY: &str = "GSHEETS2IMG_CONCURRENCY";
    /// Overrides `firefox.binary`.
    pub const FIREFOX_BINARY: &str = "GSHEETS2IMG_FIREFOX_BINARY";
    /// Overrides `firefox.extension`.
    pub const FIREFOX_EXTENSION: &str = "GSHEETS2IMG_FIREFOX_EXTENSION";
}

// ============================================================================
// Config
// ============================================================================

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Spreadsheet and output settings.
    #[serde(default)]
    pub gsheets2img: SheetsConfig,
    /// Browser settings.
    #[serde(default)]
    pub firefox: FirefoxConfig,
}

/// The `gsheets2img` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetsConfig {
    /// Spreadsheet document id.
    #[serde(rename = "sheetID", default)]
    pub sheet_id: String,
    /// Where images are written. Created if absent.
    #[serde(default)]
    pub output_dir: PathBuf,
    /// Allow-list of tab names.
    #[serde(default)]
    pub include_sheets: Option<Vec<String>>,
    /// Deny-list of tab names.
    #[serde(default)]
    pub exclude_sheets: Option<Vec<String>>,
    /// Maximum tabs rendered at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// `jpg` or `png`.
    #[serde(default = "default_image_format")]
    pub image_format: String,
    /// JPEG quality, 1-100.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Export URL template containing `{sheetId}`.
    #[serde(default = "default_export_url")]
    pub export_url: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            sheet_id: String::new(),
            output_dir: PathBuf::new(),
            include_sheets: None,
            exclude_sheets: None,
            concurrency: default_concurrency(),
            image_format: default_image_format(),
            jpeg_quality: default_jpeg_quality(),
            export_url: default_export_url(),
        }
    }
}

/// The `firefox` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirefoxConfig {
    /// Firefox executable.
    #[serde(default)]
    pub binary: PathBuf,
    /// Automation extension, directory or `.xpi`.
    #[serde(default)]
    pub extension: PathBuf,
    /// Run without a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for FirefoxConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::new(),
            extension: PathBuf::new(),
            headless: default_headless(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_image_format() -> String {
    "jpg".to_string()
}

fn default_jpeg_quality() -> u8 {
    ImageFormat::DEFAULT_JPEG_QUALITY
}

fn default_export_url() -> String {
    DEFAULT_EXPORT_URL.to_string()
}

fn default_headless() -> bool {
    true
}

// ============================================================================
// Config - Loading
// ============================================================================

impl Config {
    /// Loads, overrides from the process environment, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file is unreadable, malformed or
    /// invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {e}", path.display())))?;

        let mut config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        debug!(path = %path.display(), ?config, "Configuration loaded");
        Ok(config)
    }

    /// Parses JSON without validating.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON does not match the schema.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::config(e.to_string()))
    }

    /// Replaces values with those `lookup` returns for the override
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a concurrency override is not an
    /// integer.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env::SHEET_ID) {
            self.gsheets2img.sheet_id = v;
        }
        if let Some(v) = lookup(env::OUTPUT_DIR) {
            self.gsheets2img.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(env::CONCURRENCY) {
            self.gsheets2img.concurrency = v.trim().parse().map_err(|e| {
                Error::config(format!("{} must be a positive integer: {e}", env::CONCURRENCY))
            })?;
        }
        if let Some(v) = lookup(env::FIREFOX_BINARY) {
            self.firefox.binary = PathBuf::from(v);
        }
        if let Some(v) = lookup(env::FIREFOX_EXTENSION) {
            self.firefox.extension = PathBuf::from(v);
        }
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let sheets = &self.gsheets2img;

        if sheets.sheet_id.trim().is_empty() {
            return Err(Error::config("gsheets2img.sheetID is required"));
        }
        if sheets.output_dir.as_os_str().is_empty() {
            return Err(Error::config("gsheets2img.outputDir is required"));
        }
        if !(1..=MAX_CONCURRENCY).contains(&sheets.concurrency) {
            return Err(Error::config(format!(
                "gsheets2img.concurrency must be within 1-{MAX_CONCURRENCY}"
            )));
        }
        if !(1..=100).contains(&sheets.jpeg_quality) {
            return Err(Error::config("gsheets2img.jpegQuality must be within 1-100"));
        }
        if !sheets.export_url.contains(SHEET_ID_PLACEHOLDER) {
            return Err(Error::config(format!(
                "gsheets2img.exportUrl must contain {SHEET_ID_PLACEHOLDER}"
            )));
        }
        self.image_format()?;

        if self.firefox.binary.as_os_str().is_empty() {
            return Err(Error::config("firefox.binary is required"));
        }
        if self.firefox.extension.as_os_str().is_empty() {
            return Err(Error::config("firefox.extension is required"));
        }
        Ok(())
    }
}

// ============================================================================
// Config - Conversions
// ============================================================================

impl Config {
    /// Output image format with the configured quality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown format name.
    pub fn image_format(&self) -> Result<ImageFormat> {
        let format: ImageFormat = self.gsheets2img.image_format.parse()?;
        Ok(match format {
            ImageFormat::Jpeg(_) => ImageFormat::jpeg(self.gsheets2img.jpeg_quality),
            png => png,
        })
    }

    /// Scheduler settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown format name.
    pub fn render_settings(&self) -> Result<RenderSettings> {
        Ok(RenderSettings {
            concurrency: self.gsheets2img.concurrency,
            format: self.image_format()?,
            device_pixel_ratio: DEVICE_PIXEL_RATIO,
        })
    }

    /// Tab selection criteria.
    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection {
            include: self.gsheets2img.include_sheets.clone(),
            exclude: self.gsheets2img.exclude_sheets.clone(),
        }
    }

    /// Browser launch settings.
    #[must_use]
    pub fn firefox_settings(&self) -> FirefoxSettings {
        FirefoxSettings {
            binary: self.firefox.binary.clone(),
            extension: self.firefox.extension.clone(),
            headless: self.firefox.headless,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
