//! Chrome executable discovery and version checks.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::error::ScrapeError;

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// Names probed on `$PATH` when no fixed location matches.
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Resolve the Chrome executable: explicit configuration first, then fixed
/// install locations, then `$PATH`.
pub fn find_chrome(configured: Option<&Path>) -> Result<PathBuf, ScrapeError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ScrapeError::Launch(format!(
            "configured chrome binary does not exist: {}",
            path.display()
        )));
    }

    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(ScrapeError::Launch(
        "Chrome/Chromium not found; install it or set browser.chrome_binary".into(),
    ))
}

static MAJOR_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.").expect("static regex"));

/// Extract the major version from a product string like "Chrome/120.0.6099.1"
/// or "HeadlessChrome/145.0.7204.3".
pub fn parse_major_version(product: &str) -> Option<u32> {
    MAJOR_VERSION_RE
        .captures(product)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_from_product_string() {
        assert_eq!(parse_major_version("Chrome/120.0.6099.109"), Some(120));
        assert_eq!(parse_major_version("HeadlessChrome/145.0.7204.3"), Some(145));
        assert_eq!(parse_major_version("no digits here"), None);
    }

    #[test]
    fn configured_missing_binary_is_a_launch_error() {
        let err = find_chrome(Some(Path::new("/nonexistent/chrome-xyz"))).unwrap_err();
        assert!(matches!(err, ScrapeError::Launch(_)));
    }
}
