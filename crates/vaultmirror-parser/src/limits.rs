//! Size policy: control-character stripping and per-block length limits

use vaultmirror_core::{ContentBlock, RichText};

/// Remove ASCII control characters except newline and tab
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\n' || *c == '\t' || (*c as u32) >= 0x20)
        .collect()
}

/// Strip control characters from every text field of a block
pub fn sanitize_block(block: ContentBlock) -> ContentBlock {
    let clean = |text: RichText| text.map_content(strip_control_chars);
    match block {
        ContentBlock::Heading { level, text } => ContentBlock::Heading {
            level,
            text: clean(text),
        },
        ContentBlock::Paragraph { text } => ContentBlock::Paragraph { text: clean(text) },
        ContentBlock::BulletItem { text } => ContentBlock::BulletItem { text: clean(text) },
        ContentBlock::NumberedItem { text } => ContentBlock::NumberedItem { text: clean(text) },
        ContentBlock::CodeBlock { language, text } => ContentBlock::CodeBlock {
            language,
            text: strip_control_chars(&text),
        },
        ContentBlock::Divider => ContentBlock::Divider,
    }
}

/// Character ranges that each fit in `limit`.
///
/// Each fragment ends at the last newline before the limit; the newline
/// itself is dropped. Without a usable newline the text is cut at exactly
/// `limit` characters. Empty fragments are skipped unless the text is empty.
pub fn split_ranges(text: &str, limit: usize) -> Vec<(usize, usize)> {
    let limit = limit.max(1);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut ranges = Vec::new();
    let mut start = 0;

    while len - start > limit {
        let window_end = start + limit;
        let newline = (start + 1..=window_end).rev().find(|&i| chars[i] == '\n');
        match newline {
            Some(i) => {
                ranges.push((start, i));
                start = i + 1;
            }
            None => {
                ranges.push((start, window_end));
                start = window_end;
            }
        }
    }
    ranges.push((start, len));

    let non_empty: Vec<_> = ranges.into_iter().filter(|(s, e)| e > s).collect();
    if non_empty.is_empty() {
        vec![(0, len)]
    } else {
        non_empty
    }
}

/// Split a block into same-typed fragments whose text fits in `limit`
pub fn split_block(block: ContentBlock, limit: usize) -> Vec<ContentBlock> {
    if block.text_len() <= limit {
        return vec![block];
    }

    match block {
        ContentBlock::CodeBlock { language, text } => {
            let chars: Vec<char> = text.chars().collect();
            split_ranges(&text, limit)
                .into_iter()
                .map(|(s, e)| ContentBlock::CodeBlock {
                    language: language.clone(),
                    text: chars[s..e].iter().collect(),
                })
                .collect()
        }
        ContentBlock::Heading { level, text } => split_rich(&text, limit)
            .into_iter()
            .map(|text| ContentBlock::Heading { level, text })
            .collect(),
        ContentBlock::Paragraph { text } => split_rich(&text, limit)
            .into_iter()
            .map(|text| ContentBlock::Paragraph { text })
            .collect(),
        ContentBlock::BulletItem { text } => split_rich(&text, limit)
            .into_iter()
            .map(|text| ContentBlock::BulletItem { text })
            .collect(),
        ContentBlock::NumberedItem { text } => split_rich(&text, limit)
            .into_iter()
            .map(|text| ContentBlock::NumberedItem { text })
            .collect(),
        ContentBlock::Divider => vec![ContentBlock::Divider],
    }
}

fn split_rich(text: &RichText, limit: usize) -> Vec<RichText> {
    split_ranges(&text.to_plain_text(), limit)
        .into_iter()
        .map(|(s, e)| text.slice(s, e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultmirror_core::TextSpan;

    #[test]
    fn test_strip_control_chars() {
        assert_eq!(strip_control_chars("a\u{0}b\u{7}c\td\ne\r"), "abc\td\ne");
    }

    #[test]
    fn test_short_text_is_one_range() {
        assert_eq!(split_ranges("abc", 10), vec![(0, 3)]);
        assert_eq!(split_ranges("", 10), vec![(0, 0)]);
    }

    #[test]
    fn test_split_at_last_newline() {
        let text = "aaaa\nbbbb\ncccc";
        // limit 10 fits "aaaa\nbbbb" (9 chars) but not the whole text
        assert_eq!(split_ranges(text, 10), vec![(0, 9), (10, 14)]);
    }

    #[test]
    fn test_split_without_newline_cuts_at_limit() {
        assert_eq!(split_ranges("abcdefghij", 4), vec![(0, 4), (4, 8), (8, 10)]);
    }

    #[test]
    fn test_code_block_split_preserves_lines() {
        let lines: Vec<String> = (0..50).map(|i| format!("line {:02}", i)).collect();
        let code = lines.join("\n");
        let blocks = split_block(ContentBlock::code("rust", code.clone()), 100);

        assert!(blocks.len() > 1);
        for block in &blocks {
            assert!(block.text_len() <= 100);
            assert!(matches!(block, ContentBlock::CodeBlock { language, .. } if language == "rust"));
        }
        let rejoined: Vec<String> = blocks.iter().map(|b| b.to_plain_text()).collect();
        assert_eq!(rejoined.join("\n"), code);
    }

    #[test]
    fn test_paragraph_split_keeps_links() {
        let mut text = RichText::default();
        text.push(TextSpan::plain("x".repeat(8)));
        text.push(TextSpan::linked("link", "https://l"));
        let blocks = split_block(ContentBlock::Paragraph { text }, 10);
        assert_eq!(blocks.len(), 2);
        match &blocks[1] {
            ContentBlock::Paragraph { text } => {
                assert_eq!(text.to_plain_text(), "nk");
                assert_eq!(text.spans[0].link.as_deref(), Some("https://l"));
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_sanitize_block() {
        let block = sanitize_block(ContentBlock::paragraph("bad\u{1b}[0m"));
        assert_eq!(block.to_plain_text(), "bad[0m");
    }
}
