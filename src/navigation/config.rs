//! Navigation and login-wall detection configuration.
//!
//! The detection strings are tied to the target site's current markup and
//! locale; they drift, so they are configuration data with defaults rather
//! than fixed logic.

use serde::{Deserialize, Serialize};

/// Navigation behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSettings {
    /// Authenticated surface used for login checks and as the search entry
    /// point.
    #[serde(default = "default_order_list_url")]
    pub order_list_url: String,

    /// Page-load timeout in seconds. Elapsing it is not a navigation failure;
    /// loading is stopped and explicit waits take over.
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Retry ceiling for transient navigation failures.
    #[serde(default = "default_nav_retries")]
    pub nav_retries: u32,

    /// Bounded polling iterations while waiting for the search application
    /// root element to exist.
    #[serde(default = "default_app_root_wait_iterations")]
    pub app_root_wait_iterations: u32,
}

fn default_order_list_url() -> String {
    "https://air.1688.com/app/ctf-page/trade-order-list/buyer-order-list.html?page=1&pageSize=10"
        .to_string()
}

pub fn default_page_timeout_secs() -> u64 {
    45
}

fn default_nav_retries() -> u32 {
    2
}

fn default_app_root_wait_iterations() -> u32 {
    30
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            order_list_url: default_order_list_url(),
            page_timeout_secs: default_page_timeout_secs(),
            nav_retries: default_nav_retries(),
            app_root_wait_iterations: default_app_root_wait_iterations(),
        }
    }
}

/// Login-wall detection signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Login form control selectors probed in the main document and every
    /// same-origin iframe.
    #[serde(default = "default_login_form_selectors")]
    pub login_form_selectors: Vec<String>,

    /// Lowercase substrings of the current URL that mark a login redirect.
    #[serde(default = "default_login_url_markers")]
    pub login_url_markers: Vec<String>,

    /// Substrings of the rendered page source that mark login markup.
    #[serde(default = "default_login_source_markers")]
    pub login_source_markers: Vec<String>,
}

fn default_login_form_selectors() -> Vec<String> {
    [
        r#"input[name="fm-sms-login-id"]"#,
        "input#fm-sms-login-id",
        r#"input[placeholder="请输入手机号"]"#,
        "button.fm-submit.sms-login",
        "button.fm-button.fm-submit",
        ".fm-login",
        "#login-form",
        r#"input.fm-text[type="text"]"#,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_login_url_markers() -> Vec<String> {
    vec!["login".to_string(), "passport".to_string()]
}

fn default_login_source_markers() -> Vec<String> {
    vec![
        "请输入手机号".to_string(),
        "fm-sms-login-id".to_string(),
        "fm-submit".to_string(),
    ]
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            login_form_selectors: default_login_form_selectors(),
            login_url_markers: default_login_url_markers(),
            login_source_markers: default_login_source_markers(),
        }
    }
}

impl DetectionSettings {
    /// True when the (lowercased) URL carries a login redirect marker.
    pub fn url_marks_login(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.login_url_markers.iter().any(|m| lower.contains(m))
    }

    /// True when the page source carries login markup.
    pub fn source_marks_login(&self, source: &str) -> bool {
        self.login_source_markers.iter().any(|m| source.contains(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_marker_is_case_insensitive() {
        let detection = DetectionSettings::default();
        assert!(detection.url_marks_login("https://Passport.1688.com/next"));
        assert!(detection.url_marks_login("https://example.com/member/LOGIN.html"));
        assert!(!detection.url_marks_login("https://detail.1688.com/offer/1.html"));
    }

    #[test]
    fn source_markers_match_verbatim() {
        let detection = DetectionSettings::default();
        assert!(detection.source_marks_login("<input id=\"fm-sms-login-id\">"));
        assert!(!detection.source_marks_login("<div>product page</div>"));
    }
}
