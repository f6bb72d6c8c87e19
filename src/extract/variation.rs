//! Variation label normalization and the per-page image cache.
//!
//! Raw variation labels carry trailing size or qualifier suffixes in two
//! shapes: `"<base> - <suffix>"` and `"<base><2+ spaces><suffix>"`. Labels
//! that normalize to the same base are assumed to share one representative
//! image, so one DOM interaction serves all of them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;

static MULTISPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("static regex"));

/// A normalized variation label. Equal keys share one preview image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariationKey(String);

impl VariationKey {
    /// Strip a trailing suffix: the `" - "` separator wins over the
    /// two-or-more-space rule; a single space separates nothing.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let base = if let Some((head, _)) = trimmed.split_once(" - ") {
            head.trim()
        } else if let Some(m) = MULTISPACE_RE.find(trimmed) {
            trimmed[..m.start()].trim()
        } else {
            trimmed
        };
        Self(base.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First whitespace-separated token, for the lookup fallback on labels
    /// like "White Large" that collapse to "White" on the page.
    pub fn first_token(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or(&self.0)
    }

    pub fn has_multiple_tokens(&self) -> bool {
        self.0.contains(char::is_whitespace)
    }
}

impl fmt::Display for VariationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve each name to an image URL through `lookup`, consulting a per-batch
/// cache keyed by [`VariationKey`] before any DOM interaction. The output is
/// aligned 1:1 with `names`; a failed lookup leaves `None` in its slot and
/// the batch continues. Only observed URLs enter the cache.
pub async fn resolve_with_cache<F, Fut, E>(
    names: &[String],
    mut lookup: F,
) -> Result<Vec<Option<String>>, E>
where
    F: FnMut(VariationKey) -> Fut,
    Fut: Future<Output = Result<Option<String>, E>>,
{
    let mut cache: HashMap<VariationKey, String> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let key = VariationKey::normalize(name);
        if let Some(url) = cache.get(&key) {
            out.push(Some(url.clone()));
            continue;
        }
        match lookup(key.clone()).await? {
            Some(url) => {
                cache.insert(key, url.clone());
                out.push(Some(url));
            }
            None => out.push(None),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    #[test]
    fn dash_separator_strips_suffix() {
        assert_eq!(VariationKey::normalize("Black - 38").as_str(), "Black");
        assert_eq!(VariationKey::normalize("黑色 - 38").as_str(), "黑色");
    }

    #[test]
    fn double_space_strips_suffix() {
        assert_eq!(
            VariationKey::normalize("Pink  M80-100kg").as_str(),
            "Pink"
        );
        assert_eq!(VariationKey::normalize("粉色  M80-100斤").as_str(), "粉色");
    }

    #[test]
    fn single_space_label_is_untouched() {
        let key = VariationKey::normalize("White Large");
        assert_eq!(key.as_str(), "White Large");
        assert!(key.has_multiple_tokens());
        assert_eq!(key.first_token(), "White");
    }

    #[test]
    fn dash_rule_wins_over_double_space() {
        assert_eq!(VariationKey::normalize("Red - S  extra").as_str(), "Red");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(VariationKey::normalize("  Blue  ").as_str(), "Blue");
    }

    #[tokio::test]
    async fn cache_dedupes_lookups_and_preserves_alignment() {
        let names: Vec<String> = ["Red - S", "Red - M", "Blue"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let calls = Cell::new(0u32);

        let result = resolve_with_cache(&names, |key| {
            calls.set(calls.get() + 1);
            let url = match key.as_str() {
                "Red" => Some("https://img/red.jpg".to_string()),
                "Blue" => Some("https://img/blue.jpg".to_string()),
                _ => None,
            };
            async move { Ok::<_, Infallible>(url) }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(
            result,
            vec![
                Some("https://img/red.jpg".to_string()),
                Some("https://img/red.jpg".to_string()),
                Some("https://img/blue.jpg".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn missing_slot_never_aborts_the_batch() {
        let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let result = resolve_with_cache(&names, |key| {
            let url = (key.as_str() != "B").then(|| format!("https://img/{key}.jpg"));
            async move { Ok::<_, Infallible>(url) }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 3);
        assert!(result[0].is_some());
        assert_eq!(result[1], None);
        assert!(result[2].is_some());
    }

    #[tokio::test]
    async fn failed_lookups_are_not_cached() {
        let names: Vec<String> = ["X - 1", "X - 2"].iter().map(|s| s.to_string()).collect();
        let calls = Cell::new(0u32);
        let result = resolve_with_cache(&names, |_key| {
            calls.set(calls.get() + 1);
            async move { Ok::<_, Infallible>(None) }
        })
        .await
        .unwrap();

        // Absence is not memoized; each occurrence re-attempts the lookup.
        assert_eq!(calls.get(), 2);
        assert_eq!(result, vec![None, None]);
    }
}
