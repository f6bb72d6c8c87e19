//! Shared record types passed between the pipeline and the gateway.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a product page can be reached: a direct URL when one is known, and a
/// search term for the order-list fallback. Immutable per attempt.
#[derive(Debug, Clone)]
pub struct ProductTarget {
    pub url: Option<String>,
    pub search_term: String,
}

impl ProductTarget {
    pub fn new(url: Option<String>, search_term: impl Into<String>) -> Self {
        Self {
            url,
            search_term: search_term.into(),
        }
    }
}

/// Which intake lane a pending item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchType {
    NewProduct,
    NewVariation,
}

impl LaunchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchType::NewProduct => "new_product",
            LaunchType::NewVariation => "new_variation",
        }
    }
}

/// One operator-loaded intake row: what to scrape and under which name.
#[derive(Debug, Clone)]
pub struct PendingItem {
    pub product_id: i64,
    pub name: String,
    pub variation_names: Vec<String>,
    pub reference_url: Option<String>,
    pub launch_type: LaunchType,
    pub item_date: Option<NaiveDate>,
}

impl PendingItem {
    pub fn target(&self) -> ProductTarget {
        ProductTarget::new(self.reference_url.clone(), self.name.clone())
    }
}

/// One block of description content, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DescriptionBlock {
    Text(String),
    Image(String),
}

/// Description content: alternating text/image blocks in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionContent {
    pub blocks: Vec<DescriptionBlock>,
}

impl DescriptionContent {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Image URLs in document order.
    pub fn images(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                DescriptionBlock::Image(url) => Some(url.clone()),
                DescriptionBlock::Text(_) => None,
            })
            .collect()
    }

    /// All text blocks joined by newline, or `None` when no text block exists
    /// (distinct from an empty string).
    pub fn joined_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .blocks
            .iter()
            .filter_map(|b| match b {
                DescriptionBlock::Text(t) => Some(t.as_str()),
                DescriptionBlock::Image(_) => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// Everything extracted from one product page. Built fresh per product,
/// handed once to the gateway, then discarded.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub product_id: i64,
    pub name: String,
    pub source_url: Option<String>,
    /// DOM order; first entry is the hero image.
    pub gallery_images: Vec<String>,
    /// Caller-supplied variation labels, order preserved.
    pub variation_names: Vec<String>,
    /// Aligned 1:1 with `variation_names`; `None` marks an unresolved slot.
    pub variation_images: Vec<Option<String>>,
    pub description: DescriptionContent,
    pub item_date: Option<NaiveDate>,
}

impl ProductRecord {
    pub fn hero_image(&self) -> Option<&str> {
        self.gallery_images.first().map(String::as_str)
    }

    /// Gallery images after the hero.
    pub fn supporting_images(&self) -> &[String] {
        if self.gallery_images.is_empty() {
            &[]
        } else {
            &self.gallery_images[1..]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_gallery(urls: &[&str]) -> ProductRecord {
        ProductRecord {
            product_id: 1,
            name: "x".into(),
            source_url: None,
            gallery_images: urls.iter().map(|s| s.to_string()).collect(),
            variation_names: vec![],
            variation_images: vec![],
            description: DescriptionContent::default(),
            item_date: None,
        }
    }

    #[test]
    fn hero_is_first_gallery_image() {
        let rec = record_with_gallery(&["https://a/1.jpg", "https://a/2.jpg"]);
        assert_eq!(rec.hero_image(), Some("https://a/1.jpg"));
        assert_eq!(rec.supporting_images(), &["https://a/2.jpg".to_string()]);
    }

    #[test]
    fn empty_gallery_has_no_hero() {
        let rec = record_with_gallery(&[]);
        assert_eq!(rec.hero_image(), None);
        assert!(rec.supporting_images().is_empty());
    }

    #[test]
    fn joined_text_none_when_no_text_blocks() {
        let content = DescriptionContent {
            blocks: vec![DescriptionBlock::Image("https://a/1.jpg".into())],
        };
        assert_eq!(content.joined_text(), None);

        let content = DescriptionContent {
            blocks: vec![
                DescriptionBlock::Text("one".into()),
                DescriptionBlock::Image("https://a/1.jpg".into()),
                DescriptionBlock::Text("two".into()),
            ],
        };
        assert_eq!(content.joined_text(), Some("one\ntwo".into()));
        assert_eq!(content.images(), vec!["https://a/1.jpg".to_string()]);
    }
}
