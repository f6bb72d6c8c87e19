//! DOM extraction pipeline for a loaded product page: gallery images,
//! per-variation preview images, and description content.
//!
//! Element-level failures degrade to absent values in the output record;
//! only a dead session aborts the product.

pub mod blocks;
mod config;
mod js;
pub mod variation;

use chromiumoxide::Page;
use serde::Deserialize;
use tracing::{debug, info, warn};

pub use config::ExtractionSettings;
pub use variation::VariationKey;

use crate::error::ScrapeError;
use crate::models::{DescriptionBlock, DescriptionContent};
use crate::pacing::PacingScheduler;
use crate::session::{input, SessionManager};

/// How a located variation element wants to be activated.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LocateOutcome {
    /// Filter control; needs a real click.
    Click { x: f64, y: f64 },
    /// Thumbnail; hovering updates the gallery preview.
    Hover { x: f64, y: f64 },
    /// Table-cell image; hovering spawns a popover.
    HoverPopover { x: f64, y: f64 },
    NotFound,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GalleryScan {
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    skipped_videos: u32,
}

#[derive(Debug, Deserialize, Default)]
struct WalkResult {
    #[serde(default)]
    nodes: Option<Vec<DescriptionBlock>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreviewRead {
    url: Option<String>,
}

/// Pulls structured data out of the product page.
pub struct Extractor {
    settings: ExtractionSettings,
    pacing: PacingScheduler,
}

impl Extractor {
    pub fn new(settings: ExtractionSettings, pacing: PacingScheduler) -> Self {
        Self { settings, pacing }
    }

    /// Drain the lazy-loaded gallery, then collect image sources in DOM
    /// order. Video items are skipped; the first image is the hero.
    pub async fn collect_gallery(
        &self,
        session: &SessionManager,
    ) -> Result<Vec<String>, ScrapeError> {
        let page = session.page()?;
        self.pacing.delay(1.5, 4.0).await;

        for _ in 0..self.settings.gallery_scroll_limit {
            let can_scroll: bool = page
                .evaluate(js::GALLERY_CAN_SCROLL)
                .await
                .map_err(ScrapeError::from_cdp)?
                .into_value()
                .unwrap_or(false);
            if !can_scroll {
                break;
            }
            page.evaluate(js::GALLERY_SCROLL_CLICK)
                .await
                .map_err(ScrapeError::from_cdp)?;
            self.pacing.delay(0.2, 0.7).await;
        }

        let scan: GalleryScan = page
            .evaluate(js::GALLERY_COLLECT)
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or_default();

        if scan.images.is_empty() {
            warn!("no gallery images found on page");
        } else if scan.skipped_videos > 0 {
            debug!(
                "found {} gallery images (skipped {} video items)",
                scan.images.len(),
                scan.skipped_videos
            );
        } else {
            debug!("found {} gallery images", scan.images.len());
        }

        Ok(scan.images)
    }

    /// Resolve a preview image per variation name, aligned 1:1 with the
    /// input. Names normalizing to an already-resolved key reuse the cached
    /// URL without touching the DOM; unresolvable names yield `None` and
    /// never abort the batch.
    pub async fn collect_variation_images(
        &self,
        session: &SessionManager,
        names: &[String],
    ) -> Result<Vec<Option<String>>, ScrapeError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        info!("Fetching variation images ({} variations)", names.len());
        let page = session.page()?;
        self.pacing.delay(1.5, 4.0).await;

        let result =
            variation::resolve_with_cache(names, |key| self.lookup_variation(page.clone(), key))
                .await?;

        let resolved = result.iter().filter(|v| v.is_some()).count();
        info!("variation images found: {resolved}/{}", names.len());
        Ok(result)
    }

    /// One cache-miss lookup. Per-item failures come back as `Ok(None)`;
    /// only a dead session propagates and aborts the batch.
    async fn lookup_variation(
        &self,
        page: Page,
        key: VariationKey,
    ) -> Result<Option<String>, ScrapeError> {
        match self.try_lookup(&page, &key).await {
            Ok(url) => {
                debug!("{key}: preview image captured");
                Ok(Some(url))
            }
            Err(e @ ScrapeError::DeadSession(_)) => Err(e),
            Err(ScrapeError::ElementNotFound(msg)) => {
                debug!("{key}: {msg}, recording absent");
                Ok(None)
            }
            Err(e) => {
                warn!("{key}: lookup failed ({e}), recording absent");
                Ok(None)
            }
        }
    }

    /// Locate across the three patterns (with the first-token fallback),
    /// activate the element, and read the resulting preview image.
    async fn try_lookup(&self, page: &Page, key: &VariationKey) -> Result<String, ScrapeError> {
        let mut located = self.locate(page, key.as_str()).await?;
        if located == LocateOutcome::NotFound && key.has_multiple_tokens() {
            debug!("{key}: retrying with first token {}", key.first_token());
            located = self.locate(page, key.first_token()).await?;
        }

        let (x, y, click) = match located {
            LocateOutcome::Click { x, y } => (x, y, true),
            LocateOutcome::Hover { x, y } | LocateOutcome::HoverPopover { x, y } => (x, y, false),
            LocateOutcome::NotFound => {
                return Err(ScrapeError::ElementNotFound(format!(
                    "no pattern matched label {key}"
                )));
            }
        };

        // The locate script scrolled the element into view; let it settle.
        self.pacing.delay(0.2, 0.6).await;
        input::human_move_and_click(page, &self.pacing, x, y, click).await?;

        // Give the preview or popover time to update.
        self.pacing.delay(0.4, 1.2).await;

        let read_script = if matches!(located, LocateOutcome::HoverPopover { .. }) {
            js::POPOVER_LAST_IMAGE
        } else {
            js::GALLERY_PREVIEW_IMAGE
        };
        let preview: PreviewRead = page
            .evaluate(read_script)
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or(PreviewRead { url: None });

        preview.url.ok_or_else(|| {
            ScrapeError::ElementNotFound(format!("no preview image after interacting with {key}"))
        })
    }

    async fn locate(&self, page: &Page, label: &str) -> Result<LocateOutcome, ScrapeError> {
        match page.evaluate(js::locate_variation_script(label)).await {
            Ok(eval) => Ok(eval.into_value().unwrap_or(LocateOutcome::NotFound)),
            Err(e) => {
                let e = ScrapeError::from_cdp(e);
                if matches!(e, ScrapeError::DeadSession(_)) {
                    Err(e)
                } else {
                    debug!("locate probe failed for {label}: {e}");
                    Ok(LocateOutcome::NotFound)
                }
            }
        }
    }

    /// Extract description content: scroll to the anchor, wait (bounded) for
    /// the shadow-rendered detail container, then walk it. A timeout or a
    /// missing container yields empty content, not an error.
    pub async fn collect_description(
        &self,
        session: &SessionManager,
    ) -> Result<DescriptionContent, ScrapeError> {
        let page = session.page()?;

        debug!("scrolling to description section");
        page.evaluate(js::SCROLL_TO_DESCRIPTION)
            .await
            .map_err(ScrapeError::from_cdp)?;
        self.pacing.delay(2.0, 5.0).await;

        let mut ready = false;
        for _ in 0..self.settings.description_wait_iterations {
            let status: String = page
                .evaluate(js::DESCRIPTION_READY)
                .await
                .map_err(ScrapeError::from_cdp)?
                .into_value()
                .unwrap_or_else(|_| "probe_failed".to_string());
            if status == "ready" {
                ready = true;
                break;
            }
            debug!("description status: {status}, waiting");
            self.pacing.delay(0.8, 2.0).await;
        }
        if !ready {
            warn!("description not ready within bounded wait; returning empty");
            return Ok(DescriptionContent::default());
        }

        let walk: WalkResult = page
            .evaluate(js::description_walk_script())
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or_default();

        if let Some(error) = walk.error {
            warn!("description walk failed: {error}");
            return Ok(DescriptionContent::default());
        }

        let content = blocks::merge_blocks(walk.nodes.unwrap_or_default());
        info!(
            "Description: {} images, {} text block(s)",
            content.images().len(),
            content
                .blocks
                .iter()
                .filter(|b| matches!(b, DescriptionBlock::Text(_)))
                .count()
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_outcome_parses_tagged_kinds() {
        let click: LocateOutcome =
            serde_json::from_str(r#"{"kind":"click","x":10.0,"y":20.0}"#).unwrap();
        assert_eq!(click, LocateOutcome::Click { x: 10.0, y: 20.0 });

        let popover: LocateOutcome =
            serde_json::from_str(r#"{"kind":"hover_popover","x":1.0,"y":2.0}"#).unwrap();
        assert_eq!(popover, LocateOutcome::HoverPopover { x: 1.0, y: 2.0 });

        let missing: LocateOutcome = serde_json::from_str(r#"{"kind":"not_found"}"#).unwrap();
        assert_eq!(missing, LocateOutcome::NotFound);
    }

    #[test]
    fn gallery_scan_parses_camel_case() {
        let scan: GalleryScan =
            serde_json::from_str(r#"{"images":["https://a/1.jpg"],"skippedVideos":2}"#).unwrap();
        assert_eq!(scan.images.len(), 1);
        assert_eq!(scan.skipped_videos, 2);
    }

    #[test]
    fn walk_result_parses_nodes_and_errors() {
        let ok: WalkResult = serde_json::from_str(
            r#"{"nodes":[{"kind":"text","value":"hi"},{"kind":"image","value":"https://a/1.jpg"}]}"#,
        )
        .unwrap();
        assert_eq!(ok.nodes.unwrap().len(), 2);

        let err: WalkResult = serde_json::from_str(r#"{"error":"no div#detail"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("no div#detail"));
    }
}
