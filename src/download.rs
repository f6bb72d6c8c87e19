//! Image download helper.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Characters invalid in filenames on common filesystems.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Filename length cap in characters.
const MAX_FILENAME_CHARS: usize = 100;

/// Replace invalid filename characters and cap the length.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// Download an image URL to `dest`.
pub async fn download_image(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> anyhow::Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request failed for {url}"))?
        .error_for_status()
        .with_context(|| format!("bad status for {url}"))?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("body read failed for {url}"))?;
    tokio::fs::write(dest, &bytes)
        .await
        .with_context(|| format!("write failed for {}", dest.display()))?;
    debug!("downloaded {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("plain name.jpg"), "plain name.jpg");
        assert_eq!(sanitize_filename("q?<>*|"), "q_____");
    }

    #[test]
    fn sanitize_caps_length_by_characters() {
        let long = "宽".repeat(300);
        let cleaned = sanitize_filename(&long);
        assert_eq!(cleaned.chars().count(), 100);
    }

    #[tokio::test]
    async fn download_writes_file() {
        // No network in tests; exercise only the error path for a bad URL.
        let client = reqwest::Client::new();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("img.jpg");
        let result = download_image(&client, "http://127.0.0.1:1/none.jpg", &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
