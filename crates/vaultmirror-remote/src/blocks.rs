//! JSON mapping between content blocks and the Notion block API.

use serde_json::{Map, Value, json};
use vaultmirror_core::{
    Annotations, ChildPage, ChildSummary, ContentBlock, Error, RemoteErrorKind, Result, RichText,
    SyncMetadata, TextSpan,
};

/// Rich text items the API accepts in one array
pub const MAX_RICH_TEXT_ITEMS: usize = 100;

/// Serialize one text span as a rich text item
pub fn span_to_json(span: &TextSpan) -> Value {
    let link = span.link.as_ref().map(|url| json!({ "url": url }));
    let Annotations {
        bold,
        italic,
        strikethrough,
        code,
    } = span.annotations;

    json!({
        "type": "text",
        "text": { "content": span.content, "link": link },
        "annotations": {
            "bold": bold,
            "italic": italic,
            "strikethrough": strikethrough,
            "underline": false,
            "code": code,
            "color": "default",
        },
    })
}

/// Serialize rich text, folding any overflow beyond the item limit into one
/// plain trailing item
pub fn rich_text_to_json(text: &RichText) -> Value {
    if text.spans.len() <= MAX_RICH_TEXT_ITEMS {
        return Value::Array(text.spans.iter().map(span_to_json).collect());
    }

    let (head, tail) = text.spans.split_at(MAX_RICH_TEXT_ITEMS - 1);
    let mut items: Vec<Value> = head.iter().map(span_to_json).collect();
    let rest: String = tail.iter().map(|s| s.content.as_str()).collect();
    items.push(span_to_json(&TextSpan::plain(rest)));
    Value::Array(items)
}

fn plain_rich_text(content: &str) -> Value {
    if content.is_empty() {
        Value::Array(Vec::new())
    } else {
        json!([{ "type": "text", "text": { "content": content } }])
    }
}

fn text_block(kind: &str, text: &RichText) -> Value {
    let mut block = Map::new();
    block.insert("object".to_string(), json!("block"));
    block.insert("type".to_string(), json!(kind));
    block.insert(
        kind.to_string(),
        json!({ "rich_text": rich_text_to_json(text) }),
    );
    Value::Object(block)
}

/// Serialize one content block as a Notion block object
pub fn block_to_json(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Heading { level, text } => {
            let kind = match level {
                0 | 1 => "heading_1",
                2 => "heading_2",
                _ => "heading_3",
            };
            text_block(kind, text)
        }
        ContentBlock::Paragraph { text } => text_block("paragraph", text),
        ContentBlock::BulletItem { text } => text_block("bulleted_list_item", text),
        ContentBlock::NumberedItem { text } => text_block("numbered_list_item", text),
        ContentBlock::CodeBlock { language, text } => json!({
            "object": "block",
            "type": "code",
            "code": {
                "rich_text": plain_rich_text(text),
                "language": language,
            },
        }),
        ContentBlock::Divider => json!({
            "object": "block",
            "type": "divider",
            "divider": {},
        }),
    }
}

pub fn blocks_to_json(blocks: &[ContentBlock]) -> Vec<Value> {
    blocks.iter().map(block_to_json).collect()
}

/// Page properties: the title plus one rich text property per metadata key
pub fn properties_to_json(title: &str, properties: &SyncMetadata) -> Value {
    let mut map = Map::new();
    for (key, value) in properties {
        // The title property is owned by the document name
        if key.eq_ignore_ascii_case("title") {
            continue;
        }
        map.insert(key.clone(), json!({ "rich_text": plain_rich_text(value) }));
    }
    map.insert("title".to_string(), json!({ "title": plain_rich_text(title) }));
    Value::Object(map)
}

/// Request body for creating a page under a page parent
pub fn create_page_body(
    parent_id: &str,
    title: &str,
    properties: &SyncMetadata,
    blocks: &[ContentBlock],
) -> Value {
    json!({
        "parent": { "page_id": parent_id },
        "properties": properties_to_json(title, properties),
        "children": blocks_to_json(blocks),
    })
}

fn decode_error(message: impl Into<String>) -> Error {
    Error::remote(RemoteErrorKind::Network, None, message)
}

/// Id of an object in a response body
pub fn object_id(body: &Value) -> Result<String> {
    body.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| decode_error("Response has no object id"))
}

/// Whether a page response describes a live (not archived) page
pub fn is_live_page(body: &Value) -> bool {
    let flag = |name: &str| body.get(name).and_then(Value::as_bool).unwrap_or(false);
    !flag("archived") && !flag("in_trash")
}

/// Parse a `GET /blocks/{id}/children` response
pub fn parse_child_page(body: &Value) -> Result<ChildPage> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| decode_error("Child listing has no results array"))?;

    let mut children = Vec::with_capacity(results.len());
    for item in results {
        let id = object_id(item)?;
        let kind = item.get("type").and_then(Value::as_str).unwrap_or_default();
        let is_container = matches!(kind, "child_page" | "child_database");
        let title = if is_container {
            item.get(kind)
                .and_then(|inner| inner.get("title"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        } else {
            String::new()
        };
        children.push(ChildSummary {
            id,
            title,
            is_container,
        });
    }

    let has_more = body.get("has_more").and_then(Value::as_bool).unwrap_or(false);
    let next_cursor = if has_more {
        body.get("next_cursor")
            .and_then(Value::as_str)
            .map(str::to_string)
    } else {
        None
    };

    Ok(ChildPage {
        children,
        next_cursor,
    })
}

/// Human readable message from an error response body
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            let code = v.get("code").and_then(Value::as_str).map(str::to_string);
            let message = v.get("message").and_then(Value::as_str).map(str::to_string);
            match (code, message) {
                (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
                (None, Some(message)) => Some(message),
                _ => None,
            }
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_levels() {
        let h2 = block_to_json(&ContentBlock::heading(2, "Sub"));
        assert_eq!(h2["type"], "heading_2");
        assert_eq!(h2["heading_2"]["rich_text"][0]["text"]["content"], "Sub");

        let h3 = block_to_json(&ContentBlock::Heading {
            level: 5,
            text: "Deep".into(),
        });
        assert_eq!(h3["type"], "heading_3");
    }

    #[test]
    fn test_annotations_and_links() {
        let mut text = RichText::plain("see ");
        text.push(TextSpan {
            content: "this".into(),
            link: Some("https://www.notion.so/abc".into()),
            annotations: Annotations {
                bold: true,
                ..Default::default()
            },
        });
        let json = block_to_json(&ContentBlock::BulletItem { text });

        assert_eq!(json["type"], "bulleted_list_item");
        let items = json["bulleted_list_item"]["rich_text"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0]["text"]["link"].is_null());
        assert_eq!(items[1]["text"]["link"]["url"], "https://www.notion.so/abc");
        assert_eq!(items[1]["annotations"]["bold"], true);
        assert_eq!(items[1]["annotations"]["italic"], false);
    }

    #[test]
    fn test_code_and_divider() {
        let code = block_to_json(&ContentBlock::code("python", "print(1)"));
        assert_eq!(code["code"]["language"], "python");
        assert_eq!(code["code"]["rich_text"][0]["text"]["content"], "print(1)");

        let empty = block_to_json(&ContentBlock::code("plain text", ""));
        assert_eq!(empty["code"]["rich_text"], json!([]));

        let divider = block_to_json(&ContentBlock::Divider);
        assert_eq!(divider, json!({"object": "block", "type": "divider", "divider": {}}));
    }

    #[test]
    fn test_rich_text_item_limit() {
        let mut text = RichText::default();
        for i in 0..150 {
            text.push(TextSpan {
                content: format!("{} ", i),
                link: None,
                annotations: Annotations {
                    bold: i % 2 == 0,
                    ..Default::default()
                },
            });
        }
        let items = rich_text_to_json(&text);
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), MAX_RICH_TEXT_ITEMS);
        assert!(items[99]["text"]["content"].as_str().unwrap().starts_with("99 "));
    }

    #[test]
    fn test_properties_include_title() {
        let mut meta = SyncMetadata::new();
        meta.insert("status".into(), "draft".into());
        meta.insert("title".into(), "ignored".into());

        let props = properties_to_json("Plan", &meta);
        assert_eq!(props["title"]["title"][0]["text"]["content"], "Plan");
        assert_eq!(props["status"]["rich_text"][0]["text"]["content"], "draft");
        assert_eq!(props.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_create_page_body() {
        let body = create_page_body(
            "root",
            "Folder",
            &SyncMetadata::new(),
            &[ContentBlock::paragraph("hi")],
        );
        assert_eq!(body["parent"]["page_id"], "root");
        assert_eq!(body["children"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_child_page() {
        let body = json!({
            "object": "list",
            "results": [
                {"id": "p1", "type": "child_page", "child_page": {"title": "Projects"}},
                {"id": "b1", "type": "paragraph", "paragraph": {"rich_text": []}},
                {"id": "d1", "type": "child_database", "child_database": {"title": "Tasks"}}
            ],
            "has_more": true,
            "next_cursor": "cur-2"
        });

        let page = parse_child_page(&body).unwrap();
        assert_eq!(page.children.len(), 3);
        assert_eq!(page.children[0].title, "Projects");
        assert!(page.children[0].is_container);
        assert!(!page.children[1].is_container);
        assert!(page.children[2].is_container);
        assert_eq!(page.next_cursor.as_deref(), Some("cur-2"));

        let last = parse_child_page(&json!({"results": [], "has_more": false, "next_cursor": null}))
            .unwrap();
        assert!(last.next_cursor.is_none());
    }

    #[test]
    fn test_parse_child_page_rejects_garbage() {
        assert!(parse_child_page(&json!({"oops": 1})).is_err());
    }

    #[test]
    fn test_is_live_page() {
        assert!(is_live_page(&json!({"id": "x", "archived": false})));
        assert!(!is_live_page(&json!({"id": "x", "archived": true})));
        assert!(!is_live_page(&json!({"id": "x", "in_trash": true})));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"object":"error","status":400,"code":"validation_error","message":"body failed validation"}"#;
        assert_eq!(error_message(body), "validation_error: body failed validation");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
