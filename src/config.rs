//! Configuration management.
//!
//! Everything the core consumes — profile path, browser version, timeouts,
//! retry counts, pacing bounds, detection strings — is externally supplied
//! through one TOML file with per-field defaults, never hardcoded in the
//! components.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::PartnerApiSettings;
use crate::extract::ExtractionSettings;
use crate::navigation::{DetectionSettings, NavigationSettings};
use crate::pacing::PacingSettings;
use crate::session::BrowserSettings;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "skuacquire.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("skuacquire.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Top-level settings, one section per component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub browser: BrowserSettings,
    pub pacing: PacingSettings,
    pub navigation: NavigationSettings,
    pub detection: DetectionSettings,
    pub extraction: ExtractionSettings,
    pub database: DatabaseSettings,
    pub partner_api: PartnerApiSettings,
}

impl Settings {
    /// Load settings from an explicit path, the default config file if it
    /// exists, or built-in defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                p.exists().then_some(p)
            }
        };

        match path {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                let settings = toml::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?;
                info!("loaded config from {}", path.display());
                Ok(settings)
            }
            None => {
                debug!("no config file found; using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.navigation.page_timeout_secs, 45);
        assert_eq!(settings.extraction.gallery_scroll_limit, 50);
        assert!(!settings.detection.login_form_selectors.is_empty());
        assert_eq!(settings.database.path, PathBuf::from("skuacquire.db"));
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let settings: Settings = toml::from_str(
            r#"
            [browser]
            profile_dir = "~/chrome-profile"
            major_version = 145

            [navigation]
            page_timeout_secs = 60

            [pacing]
            idle_probability = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(settings.browser.profile_dir.as_deref(), Some("~/chrome-profile"));
        assert_eq!(settings.browser.major_version, Some(145));
        assert_eq!(settings.navigation.page_timeout_secs, 60);
        assert_eq!(settings.pacing.idle_probability, 0.1);
        // Untouched sections keep their defaults.
        assert_eq!(settings.navigation.nav_retries, 2);
        assert_eq!(settings.extraction.description_wait_iterations, 10);
    }

    #[test]
    fn delay_ranges_parse_from_toml_tables() {
        let settings: Settings = toml::from_str(
            r#"
            [pacing.medium_pause]
            min_secs = 30.0
            max_secs = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(settings.pacing.medium_pause.min_secs, 30.0);
        assert_eq!(settings.pacing.medium_pause.max_secs, 60.0);
    }
}
