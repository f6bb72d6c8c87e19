//! Shared JavaScript fragments and quoting helpers.
//!
//! The target surface hides most of its controls behind nested shadow roots,
//! so element discovery runs in page JS. The generic traversal lives here;
//! the site-specific selector tables live next to their callers in
//! `navigation::js` and `extract::js`.

/// Depth-first search across shadow roots, parametrized by a CSS selector.
/// The light DOM is queried first; descendants' shadow roots are visited
/// depth-first after it. Returns an array of matches from the first scope
/// that has any.
pub const FIND_IN_SHADOW_FN: &str = r#"
function findInShadow(root, selector) {
    let result = root.querySelectorAll(selector);
    if (result.length > 0) return Array.from(result);
    const allElements = root.querySelectorAll('*');
    for (const el of allElements) {
        if (el.shadowRoot) {
            result = findInShadow(el.shadowRoot, selector);
            if (result.length > 0) return result;
        }
    }
    return [];
}
"#;

/// Quote a Rust string as a JavaScript string literal.
pub fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Quote a list of Rust strings as a JavaScript array literal.
pub fn js_string_array(items: &[String]) -> String {
    serde_json::Value::Array(
        items
            .iter()
            .map(|s| serde_json::Value::String(s.clone()))
            .collect(),
    )
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes_and_backslashes() {
        assert_eq!(js_string("plain"), r#""plain""#);
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn js_string_array_builds_literal() {
        let items = vec!["a".to_string(), "b\"c".to_string()];
        assert_eq!(js_string_array(&items), r#"["a","b\"c"]"#);
    }
}
