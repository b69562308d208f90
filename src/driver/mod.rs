//! Firefox process management.
//!
//! [`Driver`] starts the localhost WebSocket server and launches Firefox
//! windows that connect back to it. Each window runs on its own throwaway
//! [`Profile`] with the automation [`Extension`] installed.
//!
//! ```no_run
//! use sheets2img::driver::{Driver, FirefoxOptions};
//!
//! # async fn example() -> sheets2img::Result<()> {
//! let driver = Driver::builder()
//!     .binary("/usr/bin/firefox")
//!     .extension("./extension")
//!     .build()
//!     .await?;
//!
//! let window = driver
//!     .spawn_window(FirefoxOptions::new().with_headless())
//!     .await?;
//! let tab = window.new_tab().await?;
//! tab.close().await?;
//! driver.close().await?;
//! # Ok(())
//! # }
//! ```

/// Init page that hands the WebSocket URL to the extension.
pub mod assets;

/// Driver configuration.
pub mod builder;

/// Launcher and window registry.
pub mod core;

/// Firefox command-line options.
pub mod options;

/// Throwaway profiles.
pub mod profile;

pub use builder::DriverBuilder;
pub use core::Driver;
pub use options::FirefoxOptions;
pub use profile::{Extension, ExtensionKind, Profile};
