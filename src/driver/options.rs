//! Firefox command-line options.

use crate::error::{Error, Result};

/// How a Firefox window is started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirefoxOptions {
    /// No visible window.
    pub headless: bool,
    /// Outer window size in CSS pixels.
    pub window_size: Option<(u32, u32)>,
    /// Passed through after the generated arguments.
    pub extra_args: Vec<String>,
}

impl FirefoxOptions {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            headless: false,
            window_size: None,
            extra_args: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_headless(self) -> Self {
        Self {
            headless: true,
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub fn with_window_size(self, width: u32, height: u32) -> Self {
        Self {
            window_size: Some((width, height)),
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Arguments in launch order: `--headless`, `--window-size W,H`, extras.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let headless = self.headless.then(|| "--headless".to_owned());
        let size = self
            .window_size
            .map(|(w, h)| ["--window-size".to_owned(), format!("{w},{h}")]);

        headless
            .into_iter()
            .chain(size.into_iter().flatten())
            .chain(self.extra_args.iter().cloned())
            .collect()
    }

    /// # Errors
    ///
    /// [`Error::Config`] when a window dimension is zero.
    pub fn validate(&self) -> Result<()> {
        match self.window_size {
            Some((0, _) | (_, 0)) => Err(Error::config("Window dimensions must be greater than zero")),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_args() {
        assert_eq!(FirefoxOptions::new(), FirefoxOptions::default());
        assert!(FirefoxOptions::new().to_args().is_empty());
    }

    #[test]
    fn test_args_in_launch_order() {
        let args = FirefoxOptions::new()
            .with_arg("--safe-mode")
            .with_window_size(1920, 1080)
            .with_headless()
            .to_args();
        assert_eq!(args, ["--headless", "--window-size", "1920,1080", "--safe-mode"]);
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        assert!(FirefoxOptions::new().validate().is_ok());
        assert!(FirefoxOptions::new().with_window_size(800, 600).validate().is_ok());
        assert!(FirefoxOptions::new().with_window_size(0, 600).validate().is_err());
        assert!(FirefoxOptions::new().with_window_size(800, 0).validate().is_err());
    }
}
