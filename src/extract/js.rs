//! Selector contract for the product page.
//!
//! Gallery, SKU filter/hover/popover, and description containers are a
//! versioned contract against the target site's markup. When the site
//! restructures, this file changes and nothing else does.

use crate::js::{js_string, js_string_array};

/// Subtrees excluded wholesale from the description walk: dynamically
/// injected cross-sell modules, not catalog content.
const DESCRIPTION_EXCLUDE_SELECTORS: &[&str] = &[
    ".sdmap-dynamic-offer-list",
    ".offer-list-wapper",
    ".desc-dynamic-module",
    ".rich-text-component",
];

/// Image classes excluded from the description walk.
const DESCRIPTION_EXCLUDE_IMAGE_CLASSES: &[&str] = &["dynamic-backup-img"];

/// True while the gallery's "scroll further" control is visible and usable.
pub const GALLERY_CAN_SCROLL: &str = r#"
(() => {
    const btn = document.querySelector('button.od-gallery-button-under');
    if (!btn) return false;
    const style = window.getComputedStyle(btn);
    return style.visibility !== 'hidden' && style.display !== 'none';
})()
"#;

/// Advance the lazy-loaded gallery by one step.
pub const GALLERY_SCROLL_CLICK: &str = r#"
(() => {
    const btn = document.querySelector('button.od-gallery-button-under');
    if (btn) btn.click();
    return true;
})()
"#;

/// Collect gallery image sources in DOM order, skipping video items.
pub const GALLERY_COLLECT: &str = r#"
(() => {
    const images = [];
    let skippedVideos = 0;
    const items = document.querySelectorAll('.od-gallery-list > li');
    items.forEach((item) => {
        if (item.querySelector('.od-video-wrapper')) {
            skippedVideos++;
            return;
        }
        const img = item.querySelector('img.ant-image-img.preview-img');
        if (img && img.src) {
            images.push(img.src);
        }
    });
    return { images: images, skippedVideos: skippedVideos };
})()
"#;

/// Read the current gallery preview image (first list item).
pub const GALLERY_PREVIEW_IMAGE: &str = r#"
(() => {
    const img = document.querySelector('.od-gallery-preview .od-gallery-list li:first-child img.preview-img');
    return { url: img ? img.src : null };
})()
"#;

/// Read the most recent hover popover image. Each hover appends a new
/// popover node; the last one is the live instance, earlier ones are stale.
pub const POPOVER_LAST_IMAGE: &str = r#"
(() => {
    const popovers = document.querySelectorAll('.ant-popover-inner-content img');
    if (popovers.length === 0) return { url: null };
    return { url: popovers[popovers.length - 1].src };
})()
"#;

/// Locate the page element for a variation label across the three known
/// patterns, scroll it into view, and return its bounding-box center tagged
/// with the interaction kind. Patterns are mutually exclusive and checked in
/// priority order.
pub fn locate_variation_script(label: &str) -> String {
    format!(
        r#"
        (() => {{
            const targetLabel = {label};

            // Pattern 1: clickable filter button with a label span
            for (const btn of document.querySelectorAll('button.sku-filter-button')) {{
                const label = btn.querySelector('span.label-name');
                if (label && label.textContent.trim() === targetLabel) {{
                    btn.scrollIntoView({{ block: 'center' }});
                    const rect = btn.getBoundingClientRect();
                    return {{
                        kind: 'click',
                        x: rect.x + rect.width / 2,
                        y: rect.y + rect.height / 2
                    }};
                }}
            }}

            // Pattern 2: hoverable thumbnail next to an item label
            for (const div of document.querySelectorAll('div.v-flex')) {{
                const label = div.querySelector('span.item-label');
                const img = div.querySelector('img.ant-image-img');
                if (label && label.textContent.trim() === targetLabel && img) {{
                    img.scrollIntoView({{ block: 'center' }});
                    const rect = img.getBoundingClientRect();
                    return {{
                        kind: 'hover',
                        x: rect.x + rect.width / 2,
                        y: rect.y + rect.height / 2
                    }};
                }}
            }}

            // Pattern 3: table-cell title with an image; needs a hover popover
            for (const title of document.querySelectorAll('div.gyp-pro-table-title')) {{
                const p = title.querySelector('p');
                const img = title.querySelector('img');
                if (p && p.textContent.trim() === targetLabel && img) {{
                    img.scrollIntoView({{ block: 'center' }});
                    const rect = img.getBoundingClientRect();
                    return {{
                        kind: 'hover_popover',
                        x: rect.x + rect.width / 2,
                        y: rect.y + rect.height / 2
                    }};
                }}
            }}

            return {{ kind: 'not_found' }};
        }})()
        "#,
        label = js_string(label),
    )
}

/// Scroll to the description anchor, or to page bottom when absent.
pub const SCROLL_TO_DESCRIPTION: &str = r#"
(() => {
    const descSection = document.querySelector('#description');
    if (descSection) {
        descSection.scrollIntoView({ behavior: 'instant', block: 'center' });
    } else {
        window.scrollTo(0, document.body.scrollHeight);
    }
    return true;
})()
"#;

/// Probe the shadow-rendered description container. Returns 'ready' once the
/// detail subtree exists with non-trivial content, otherwise a status naming
/// the first missing layer.
pub const DESCRIPTION_READY: &str = r#"
(() => {
    const desc = document.querySelector('#description');
    if (!desc) return 'no_description_section';
    const vDetail = desc.querySelector('.html-description');
    if (!vDetail) return 'no_html_description';
    if (!vDetail.shadowRoot) return 'no_shadow_root';
    const detail = vDetail.shadowRoot.querySelector('div#detail');
    if (!detail) return 'no_detail_div';
    if (detail.innerHTML.length < 100) return 'content_loading';
    return 'ready';
})()
"#;

/// Walk the description detail subtree depth-first and emit raw text/image
/// nodes in document order, excluding dynamic-module containers and marker
/// image classes. Returns `{nodes}` or `{error}`.
pub fn description_walk_script() -> String {
    format!(
        r#"
        (() => {{
            const desc = document.querySelector('#description');
            if (!desc) return {{ error: 'no #description section' }};
            const vDetail = desc.querySelector('.html-description');
            if (!vDetail) return {{ error: 'no .html-description component' }};
            if (!vDetail.shadowRoot) return {{ error: vDetail.tagName + ' has no shadow root' }};
            const detailDiv = vDetail.shadowRoot.querySelector('div#detail');
            if (!detailDiv) return {{ error: 'no div#detail in shadow root' }};

            const excludeSelectors = {exclude_selectors};
            const excludeImageClasses = {exclude_image_classes};
            const nodes = [];

            function extractContent(node) {{
                if (node.nodeType === Node.TEXT_NODE) {{
                    const text = node.textContent.trim();
                    if (text && text !== '&nbsp;') {{
                        nodes.push({{ kind: 'text', value: text }});
                    }}
                }} else if (node.nodeType === Node.ELEMENT_NODE) {{
                    for (const selector of excludeSelectors) {{
                        if (node.matches && node.matches(selector)) return;
                    }}
                    if (node.tagName === 'IMG') {{
                        for (const cls of excludeImageClasses) {{
                            if (node.classList.contains(cls)) return;
                        }}
                        const src = node.getAttribute('src');
                        if (src) {{
                            nodes.push({{ kind: 'image', value: src }});
                        }}
                    }} else {{
                        for (const child of node.childNodes) {{
                            extractContent(child);
                        }}
                    }}
                }}
            }}

            extractContent(detailDiv);
            return {{ nodes: nodes }};
        }})()
        "#,
        exclude_selectors = js_string_array(
            &DESCRIPTION_EXCLUDE_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        ),
        exclude_image_classes = js_string_array(
            &DESCRIPTION_EXCLUDE_IMAGE_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_script_embeds_quoted_label() {
        let script = locate_variation_script(r#"Red "Special""#);
        assert!(script.contains(r#""Red \"Special\"""#));
        assert!(script.contains("sku-filter-button"));
        assert!(script.contains("hover_popover"));
    }

    #[test]
    fn walk_script_embeds_exclusions() {
        let script = description_walk_script();
        assert!(script.contains("sdmap-dynamic-offer-list"));
        assert!(script.contains("dynamic-backup-img"));
    }
}
