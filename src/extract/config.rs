//! Extraction pipeline knobs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Ceiling on "scroll further" clicks while draining the lazy-loaded
    /// gallery; guards against a control that never disables.
    #[serde(default = "default_gallery_scroll_limit")]
    pub gallery_scroll_limit: u32,

    /// Bounded polling iterations while waiting for the shadow-rendered
    /// description container to fill.
    #[serde(default = "default_description_wait_iterations")]
    pub description_wait_iterations: u32,
}

fn default_gallery_scroll_limit() -> u32 {
    50
}

fn default_description_wait_iterations() -> u32 {
    10
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            gallery_scroll_limit: default_gallery_scroll_limit(),
            description_wait_iterations: default_description_wait_iterations(),
        }
    }
}
