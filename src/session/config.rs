//! Browser session configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the profile-backed browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Chromium user-data directory holding the logged-in profile.
    /// Supports `~` and `$VAR` expansion.
    #[serde(default)]
    pub profile_dir: Option<String>,

    /// Profile directory name inside the user-data dir (e.g. "Profile 1").
    #[serde(default)]
    pub profile_name: Option<String>,

    /// Explicit Chrome/Chromium executable. When unset, common install
    /// locations and `$PATH` are searched.
    #[serde(default)]
    pub chrome_binary: Option<PathBuf>,

    /// Expected major version of the installed browser. Checked against the
    /// live browser after launch; a mismatch is logged so the operator can
    /// update the config instead of chasing protocol breakage.
    #[serde(default)]
    pub major_version: Option<u32>,

    /// Run headless. Defaults to false: the profile-backed login flow needs a
    /// visible window for the operator to resolve login walls.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

pub fn default_headless() -> bool {
    false
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            profile_dir: None,
            profile_name: None,
            chrome_binary: None,
            major_version: None,
            headless: default_headless(),
            chrome_args: Vec::new(),
        }
    }
}
