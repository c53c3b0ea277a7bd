//! Frontmatter extraction: ---\nYAML\n---
//!
//! The interior is parsed as YAML first. Scalar values become strings and
//! sequences are joined with `", "`. When the interior is not valid YAML the
//! lines are read as plain `key: value` pairs with surrounding quotes
//! stripped.

use serde_yaml::Value;
use vaultmirror_core::SyncMetadata;

const DELIMITER: &str = "---";

/// Split raw document text into (metadata, body).
///
/// Frontmatter is only recognized when the very first line is a `---`
/// delimiter and a second delimiter line follows. Otherwise the metadata is
/// empty and the whole text is body.
pub fn extract_frontmatter(raw: &str) -> (SyncMetadata, &str) {
    let Some(first_end) = raw.find('\n') else {
        return (SyncMetadata::new(), raw);
    };
    if raw[..first_end].trim_end() != DELIMITER {
        return (SyncMetadata::new(), raw);
    }

    let interior_start = first_end + 1;
    let mut offset = interior_start;
    for line in raw[interior_start..].split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if line.trim_end() == DELIMITER {
            let interior = &raw[interior_start..line_start];
            let body = &raw[offset..];
            return (parse_metadata(interior), body);
        }
    }

    (SyncMetadata::new(), raw)
}

/// Parse the frontmatter interior into string properties
pub fn parse_metadata(interior: &str) -> SyncMetadata {
    match serde_yaml::from_str::<Value>(interior) {
        Ok(Value::Mapping(mapping)) => {
            let mut metadata = SyncMetadata::new();
            for (key, value) in mapping {
                let Some(key) = scalar_to_string(&key) else {
                    continue;
                };
                if let Some(value) = value_to_string(&value) {
                    metadata.insert(key, value);
                }
            }
            metadata
        }
        Ok(Value::Null) => SyncMetadata::new(),
        Ok(_) | Err(_) => {
            log::debug!("Frontmatter is not a YAML mapping, falling back to key: value lines");
            parse_key_value_lines(interior)
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Mapping(_) => serde_yaml::to_string(value)
            .ok()
            .map(|s| s.trim_end().to_string()),
        other => scalar_to_string(other),
    }
}

/// Line-based `key: value` parsing with quote stripping
pub fn parse_key_value_lines(interior: &str) -> SyncMetadata {
    let mut metadata = SyncMetadata::new();
    for line in interior.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        metadata.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }
    metadata
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_frontmatter() {
        let (meta, body) = extract_frontmatter("---\ntitle: Test\n---\nContent here");
        assert_eq!(meta.get("title").map(String::as_str), Some("Test"));
        assert_eq!(body, "Content here");
    }

    #[test]
    fn test_quotes_and_lists() {
        let content = "---\nstatus: \"draft\"\ntags:\n  - rust\n  - sync\ncount: 3\n---\n# Body";
        let (meta, body) = extract_frontmatter(content);
        assert_eq!(meta["status"], "draft");
        assert_eq!(meta["tags"], "rust, sync");
        assert_eq!(meta["count"], "3");
        assert_eq!(body, "# Body");
    }

    #[test]
    fn test_no_frontmatter() {
        let content = "Just content\n---\nNo frontmatter";
        let (meta, body) = extract_frontmatter(content);
        assert!(meta.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_unclosed_frontmatter_is_body() {
        let content = "---\ntitle: Test\nNo closing";
        let (meta, body) = extract_frontmatter(content);
        assert!(meta.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_empty_frontmatter() {
        let (meta, body) = extract_frontmatter("---\n---\nBody");
        assert!(meta.is_empty());
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_invalid_yaml_falls_back_to_lines() {
        let content = "---\ntitle: 'Quoted'\nbad: [unclosed\n---\nBody";
        let (meta, body) = extract_frontmatter(content);
        assert_eq!(meta["title"], "Quoted");
        assert_eq!(meta["bad"], "[unclosed");
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_crlf_delimiters() {
        let (meta, body) = extract_frontmatter("---\r\nkey: value\r\n---\r\nBody");
        assert_eq!(meta["key"], "value");
        assert_eq!(body, "Body");
    }
}
