//! Description block assembly.
//!
//! The page walk emits raw text and image nodes in document order; this
//! module merges adjacent text into newline-joined blocks and drops image
//! sources that are not plain http(s) URLs. A dropped image does not split
//! the text around it.

use crate::models::{DescriptionBlock, DescriptionContent};

/// Accept only http(s) image sources; `data:` and other schemes are noise
/// from the renderer, not catalog content.
pub fn valid_image_src(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Merge raw walked nodes into the final alternating text/image sequence.
pub fn merge_blocks(raw: Vec<DescriptionBlock>) -> DescriptionContent {
    let mut blocks = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    let flush = |pending: &mut Vec<String>, blocks: &mut Vec<DescriptionBlock>| {
        if !pending.is_empty() {
            blocks.push(DescriptionBlock::Text(pending.join("\n")));
            pending.clear();
        }
    };

    for node in raw {
        match node {
            DescriptionBlock::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pending.push(trimmed.to_string());
                }
            }
            DescriptionBlock::Image(src) => {
                if valid_image_src(&src) {
                    flush(&mut pending, &mut blocks);
                    blocks.push(DescriptionBlock::Image(src));
                }
            }
        }
    }
    flush(&mut pending, &mut blocks);

    DescriptionContent { blocks }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> DescriptionBlock {
        DescriptionBlock::Text(s.into())
    }

    fn image(s: &str) -> DescriptionBlock {
        DescriptionBlock::Image(s.into())
    }

    #[test]
    fn adjacent_text_merges_with_newline() {
        let content = merge_blocks(vec![
            text("one"),
            text("two"),
            image("https://a/1.jpg"),
            text("three"),
        ]);
        assert_eq!(
            content.blocks,
            vec![
                text("one\ntwo"),
                image("https://a/1.jpg"),
                text("three"),
            ]
        );
    }

    #[test]
    fn data_uri_images_are_dropped_and_do_not_split_text() {
        let content = merge_blocks(vec![
            text("one"),
            image("data:image/png;base64,AAAA"),
            text("two"),
        ]);
        assert_eq!(content.blocks, vec![text("one\ntwo")]);
        assert!(content.images().is_empty());
    }

    #[test]
    fn non_http_schemes_are_dropped() {
        let content = merge_blocks(vec![image("blob:foo"), image("https://a/ok.jpg")]);
        assert_eq!(content.images(), vec!["https://a/ok.jpg".to_string()]);
    }

    #[test]
    fn whitespace_only_text_is_ignored() {
        let content = merge_blocks(vec![text("  "), image("https://a/1.jpg"), text("\n")]);
        assert_eq!(content.blocks, vec![image("https://a/1.jpg")]);
        assert_eq!(content.joined_text(), None);
    }

    #[test]
    fn empty_walk_yields_empty_content() {
        let content = merge_blocks(vec![]);
        assert!(content.is_empty());
        assert_eq!(content.joined_text(), None);
    }
}
