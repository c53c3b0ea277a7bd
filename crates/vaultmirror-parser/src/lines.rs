//! Line classification.
//!
//! Every source line is classified into exactly one [`Line`] variant before
//! the converter acts on it. Classification is context free; whether a line
//! sits inside a code fence is decided by the converter.

/// The structural role of one source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// ```` ``` ```` fence marker with the (untrimmed) info string after it
    Fence { info: &'a str },
    /// `#`, `##`, `###` … heading; deeper levels are reported as 3
    Heading { level: u8, text: &'a str },
    /// `-`, `*` or `+` list item
    Bullet { text: &'a str },
    /// `1.` or `1)` list item
    Numbered { text: &'a str },
    /// Three or more `-`, `_` or `*` (spaces allowed between)
    Divider,
    /// Empty or whitespace-only line
    Blank,
    /// Anything else: paragraph text
    Text { text: &'a str },
}

/// Classify a single line (without its trailing newline)
pub fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    let indented = line.trim_start();
    if let Some(info) = indented.strip_prefix("```") {
        return Line::Fence { info };
    }

    if let Some(heading) = heading(trimmed) {
        return heading;
    }

    if is_divider(trimmed) {
        return Line::Divider;
    }

    if let Some(text) = bullet_text(indented) {
        return Line::Bullet { text };
    }

    if let Some(text) = numbered_text(indented) {
        return Line::Numbered { text };
    }

    Line::Text { text: trimmed }
}

/// Whether a line closes an open code fence
pub fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn heading(trimmed: &str) -> Option<Line<'_>> {
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        // `#tag` is a tag, not a heading
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim_end();
    Some(Line::Heading {
        level: hashes.min(3) as u8,
        text,
    })
}

fn is_divider(trimmed: &str) -> bool {
    let mut marker = None;
    let mut count = 0;
    for c in trimmed.chars() {
        match c {
            ' ' | '\t' => continue,
            '-' | '_' | '*' => {
                if marker.is_some_and(|m| m != c) {
                    return false;
                }
                marker = Some(c);
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}

fn bullet_text(indented: &str) -> Option<&str> {
    let mut chars = indented.chars();
    let marker = chars.next()?;
    if !matches!(marker, '-' | '*' | '+') {
        return None;
    }
    let rest = &indented[1..];
    if rest.is_empty() {
        return Some("");
    }
    if rest.starts_with([' ', '\t']) {
        return Some(rest.trim());
    }
    None
}

fn numbered_text(indented: &str) -> Option<&str> {
    let digits = indented.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = &indented[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    if rest.is_empty() {
        return Some("");
    }
    if rest.starts_with([' ', '\t']) {
        return Some(rest.trim());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank() {
        assert_eq!(classify(""), Line::Blank);
        assert_eq!(classify("   \t"), Line::Blank);
    }

    #[test]
    fn test_fence() {
        assert_eq!(classify("```py"), Line::Fence { info: "py" });
        assert_eq!(classify("  ```"), Line::Fence { info: "" });
        assert!(is_fence("```"));
        assert!(!is_fence("``not a fence"));
    }

    #[test]
    fn test_headings() {
        assert_eq!(classify("# Title"), Line::Heading { level: 1, text: "Title" });
        assert_eq!(classify("## Sub"), Line::Heading { level: 2, text: "Sub" });
        assert_eq!(classify("### Third"), Line::Heading { level: 3, text: "Third" });
        assert_eq!(classify("##### Deep"), Line::Heading { level: 3, text: "Deep" });
        assert_eq!(classify("## Closed ##"), Line::Heading { level: 2, text: "Closed" });
    }

    #[test]
    fn test_tag_is_not_heading() {
        assert_eq!(classify("#tag here"), Line::Text { text: "#tag here" });
        assert_eq!(classify("####### seven"), Line::Text { text: "####### seven" });
    }

    #[test]
    fn test_dividers() {
        assert_eq!(classify("---"), Line::Divider);
        assert_eq!(classify("___"), Line::Divider);
        assert_eq!(classify("*****"), Line::Divider);
        assert_eq!(classify("- - -"), Line::Divider);
        assert_ne!(classify("--"), Line::Divider);
        assert_ne!(classify("-_-"), Line::Divider);
    }

    #[test]
    fn test_bullets_ignore_indentation() {
        assert_eq!(classify("- item"), Line::Bullet { text: "item" });
        assert_eq!(classify("    * nested"), Line::Bullet { text: "nested" });
        assert_eq!(classify("+ plus"), Line::Bullet { text: "plus" });
        assert_eq!(classify("-not a bullet"), Line::Text { text: "-not a bullet" });
    }

    #[test]
    fn test_numbered() {
        assert_eq!(classify("1. first"), Line::Numbered { text: "first" });
        assert_eq!(classify("  12) twelfth"), Line::Numbered { text: "twelfth" });
        assert_eq!(classify("2024.01.01 log"), Line::Text { text: "2024.01.01 log" });
    }

    #[test]
    fn test_text() {
        assert_eq!(classify("  plain words "), Line::Text { text: "plain words" });
    }
}
