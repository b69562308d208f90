//! `user.js` document model.
//!
//! A [`UserJs`] is an ordered list of sections and preferences that renders
//! to the file Firefox reads at startup:
//!
//! ```javascript
//! // ---- Startup ----
//! // 0 = blank page
//! user_pref("browser.startup.page", 0);
//! ```

use std::fmt;

// ============================================================================
// PrefValue
// ============================================================================

/// A preference value, rendered as a JavaScript literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    /// `true` / `false`.
    Bool(bool),
    /// Integer.
    Int(i32),
    /// Quoted string.
    Str(String),
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            // A JSON string literal is a valid JavaScript string literal.
            Self::Str(s) => f.write_str(&serde_json::to_string(s).map_err(|_| fmt::Error)?),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PrefValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

// ============================================================================
// UserJs
// ============================================================================

#[derive(Debug, Clone)]
enum Entry {
    Section(&'static str),
    Pref {
        key: &'static str,
        value: PrefValue,
        note: Option<&'static str>,
    },
}

/// Ordered `user.js` contents.
#[derive(Debug, Clone, Default)]
pub struct UserJs {
    entries: Vec<Entry>,
}

impl UserJs {
    /// First line of every generated file.
    pub const HEADER: &'static str = "// sheets2img user.js, generated per window";

    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a titled section.
    #[must_use]
    pub fn section(mut self, title: &'static str) -> Self {
        self.entries.push(Entry::Section(title));
        self
    }

    /// Appends a preference.
    #[must_use]
    pub fn pref(mut self, key: &'static str, value: impl Into<PrefValue>) -> Self {
        self.entries.push(Entry::Pref {
            key,
            value: value.into(),
            note: None,
        });
        self
    }

    /// Annotates the preference added last. No-op after a section.
    #[must_use]
    pub fn note(mut self, text: &'static str) -> Self {
        if let Some(Entry::Pref { note, .. }) = self.entries.last_mut() {
            *note = Some(text);
        }
        self
    }

    /// Number of preferences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefs().count()
    }

    /// Returns `true` when there are no preferences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of the last preference named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PrefValue> {
        self.prefs()
            .filter(|(k, _)| *k == key)
            .map(|(_, value)| value)
            .last()
    }

    fn prefs(&self) -> impl Iterator<Item = (&'static str, &PrefValue)> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Pref { key, value, .. } => Some((*key, value)),
            Entry::Section(_) => None,
        })
    }
}

impl fmt::Display for UserJs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", Self::HEADER)?;
        for entry in &self.entries {
            match entry {
                Entry::Section(title) => writeln!(f, "\n// ---- {title} ----")?,
                Entry::Pref { key, value, note } => {
                    if let Some(note) = note {
                        writeln!(f, "// {note}")?;
                    }
                    let key = PrefValue::Str((*key).to_owned());
                    writeln!(f, "user_pref({key}, {value});")?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Render Defaults
// ============================================================================

/// Preferences for an unattended render window.
///
/// Lets the unsigned automation extension run, silences first-run and update
/// UI, turns telemetry off, and lets `file://` documents load sibling files.
#[must_use]
pub fn render_defaults() -> UserJs {
    UserJs::new()
        .section("Extension")
        .pref("xpinstall.signatures.required", false)
        .note("The automation extension is unsigned")
        .pref("extensions.autoDisableScopes", 0)
        .note("Keep profile-installed add-ons enabled")
        .pref("extensions.webextensions.restrictedDomains", "")
        .pref("security.data_uri.block_toplevel_data_uri_navigations", false)
        .note("The init page is a data: URI")
        .section("Local documents")
        .pref("security.fileuri.strict_origin_policy", false)
        .note("Exported tabs reference sibling resources")
        .section("Startup")
        .pref("browser.startup.page", 0)
        .note("0 = blank page")
        .pref("browser.shell.checkDefaultBrowser", false)
        .pref("browser.startup.homepage_override.mstone", "ignore")
        .pref("startup.homepage_welcome_url", "")
        .pref("browser.sessionstore.resume_from_crash", false)
        .pref("toolkit.startup.max_resumed_crashes", -1)
        .pref("browser.tabs.warnOnClose", false)
        .pref("browser.warnOnQuit", false)
        .pref("browser.aboutConfig.showWarning", false)
        .pref("browser.uitour.enabled", false)
        .section("Telemetry and updates")
        .pref("toolkit.telemetry.enabled", false)
        .pref("toolkit.telemetry.unified", false)
        .pref("toolkit.telemetry.server", "")
        .pref("datareporting.policy.dataSubmissionEnabled", false)
        .pref("datareporting.healthreport.uploadEnabled", false)
        .pref("app.update.service.enabled", false)
        .pref("extensions.update.enabled", false)
        .pref("app.normandy.enabled", false)
        .section("Rendering")
        .pref("browser.pagethumbnails.capturing_disabled", true)
        .pref("privacy.resistFingerprinting", false)
        .note("Keep the real devicePixelRatio and viewport size")
        .pref("ui.prefersReducedMotion", 1)
        .note("No transitions while the viewport resizes")
}

// ============================================================================
// Tests
// ============================================================================
