//! Selector contract for the order/search surface.
//!
//! Everything here is versioned against the target site's markup: the shadow
//! host chain of the search widget, the result link selector, and the
//! product-page anchors. Selector drift is the dominant failure mode and gets
//! fixed in this file without touching pacing or session logic.

use crate::js::{js_string, js_string_array, FIND_IN_SHADOW_FN};

/// Shadow host chain from the document down to the search keywords scope.
const SEARCH_SHADOW_CHAIN: &[&str] = &["app-root", "order-search", "order-search-keywords"];

/// Shadow host chain down to the search action buttons.
const SEARCH_ACTIONS_CHAIN: &[&str] = &["app-root", "order-search", "order-search-actions"];

/// Placeholder fragment identifying the product-name keyword input among the
/// `q-input` hosts.
const KEYWORD_PLACEHOLDER_MARKER: &str = "商品名称";

/// Selector for result links on the order list, searched across all shadow
/// roots.
const RESULT_LINK_SELECTOR: &str = "a.product-name";

/// Counts search application roots; non-zero means the app has booted.
pub const APP_ROOT_COUNT: &str = "document.querySelectorAll('app-root').length";

/// At least one of these anchors present means we are on a product page.
pub const PRODUCT_ANCHOR_PROBE: &str = r#"
!!(
    document.querySelector('.od-gallery-preview') ||
    document.querySelector('#description') ||
    document.querySelector('.sku-filter-button') ||
    document.querySelector('.od-gallery-list')
)
"#;

fn chain_walk(chain: &[&str]) -> String {
    format!(
        r#"
        let scope = document;
        for (const name of {chain}) {{
            const el = scope.querySelector(name);
            if (!el) return 'FAIL: no ' + name;
            if (!el.shadowRoot) return 'FAIL: ' + name + ' has no shadow root';
            scope = el.shadowRoot;
        }}
        "#,
        chain = js_string_array(&chain.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    )
}

/// Focus and select the keyword input. Returns `'SUCCESS'` or a
/// `'FAIL: ...'` string naming the missing shadow layer.
pub fn focus_search_input_script() -> String {
    format!(
        r#"
        (() => {{
            {walk}
            const inputs = scope.querySelectorAll('q-input');
            for (const qInput of inputs) {{
                const placeholder = qInput.getAttribute('placeholder') || '';
                if (placeholder.includes({marker})) {{
                    if (qInput.shadowRoot) {{
                        const input = qInput.shadowRoot.querySelector('input');
                        if (input) {{
                            input.focus();
                            input.select();
                            return 'SUCCESS';
                        }}
                    }}
                }}
            }}
            return 'FAIL: no keyword input in nested shadow DOM';
        }})()
        "#,
        walk = chain_walk(SEARCH_SHADOW_CHAIN),
        marker = js_string(KEYWORD_PLACEHOLDER_MARKER),
    )
}

/// Resolve the primary submit button and return its bounding-box center as
/// `{x, y}`, or `{error}` naming the missing layer. The walk returns strings
/// on failure, so it is wrapped to normalize into the object shape.
pub fn search_submit_probe_script() -> String {
    format!(
        r#"
        (() => {{
            const walk = (() => {{
                {walk}
                const qButton = scope.querySelector('q-button[type="primary"]');
                if (!qButton) return 'FAIL: no primary q-button';
                return qButton;
            }})();
            if (typeof walk === 'string') return {{ error: walk }};
            const rect = walk.getBoundingClientRect();
            return {{ x: rect.x + rect.width / 2, y: rect.y + rect.height / 2 }};
        }})()
        "#,
        walk = chain_walk(SEARCH_ACTIONS_CHAIN),
    )
}

/// Find the first result link across all shadow roots. Returns
/// `{found, count, href, text}`; `found` is false when nothing matched or the
/// match carries no href.
pub fn first_result_script() -> String {
    format!(
        r#"
        (() => {{
            {find_fn}
            const links = findInShadow(document, {selector});
            if (links.length === 0) return {{ found: false }};
            const first = links[0];
            const href = first.getAttribute('href');
            if (!href) return {{ found: false }};
            return {{
                found: true,
                count: links.length,
                href: href,
                text: (first.textContent || '').trim()
            }};
        }})()
        "#,
        find_fn = FIND_IN_SHADOW_FN,
        selector = js_string(RESULT_LINK_SELECTOR),
    )
}

/// Probe the given selectors in the main document and every same-origin
/// iframe. Returns `{hit}` where `hit` names the scope that matched, or null.
pub fn login_probe_script(selectors: &[String]) -> String {
    format!(
        r#"
        (() => {{
            const selectors = {selectors};
            const probe = (doc) => selectors.some(sel => {{
                try {{ return doc.querySelector(sel) !== null; }}
                catch (e) {{ return false; }}
            }});
            if (probe(document)) return {{ hit: 'document' }};
            for (const frame of document.querySelectorAll('iframe')) {{
                try {{
                    const doc = frame.contentDocument;
                    if (doc && probe(doc)) return {{ hit: 'iframe' }};
                }} catch (e) {{
                    // cross-origin frame; not inspectable
                }}
            }}
            return {{ hit: null }};
        }})()
        "#,
        selectors = js_string_array(selectors),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_script_embeds_chain_and_marker() {
        let script = focus_search_input_script();
        assert!(script.contains("app-root"));
        assert!(script.contains("order-search-keywords"));
        assert!(script.contains("商品名称"));
    }

    #[test]
    fn login_probe_quotes_selectors() {
        let script = login_probe_script(&[r#"input[name="fm-sms-login-id"]"#.to_string()]);
        assert!(script.contains(r#"\"fm-sms-login-id\""#));
    }
}
