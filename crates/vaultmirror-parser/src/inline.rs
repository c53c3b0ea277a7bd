//! Inline rendering: markdown text → rich text spans.
//!
//! Wikilinks are first rewritten to standard markdown links with a
//! `wikilink:` scheme so that `pulldown-cmark` parses them together with
//! emphasis, code spans and regular links. Link targets are then resolved
//! through a [`LinkResolver`]; anything that cannot be resolved degrades to
//! its label text.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use vaultmirror_core::{Annotations, RichText, TextSpan};

const WIKILINK_SCHEME: &str = "wikilink:";

/// Regex for wikilinks and embeds: [[target]], [[target|alias]], ![[target]]
static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap());

/// Resolves cross-document link targets to remote URLs.
pub trait LinkResolver {
    /// URL of the remote page for a wikilink target (heading suffix removed),
    /// or `None` when the target has not been mirrored yet.
    fn resolve_link(&self, target: &str) -> Option<String>;
}

/// Resolver that knows no targets; every wikilink degrades to its label.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl LinkResolver for NoLinks {
    fn resolve_link(&self, _target: &str) -> Option<String> {
        None
    }
}

/// Render markdown inline text to rich text spans
pub fn render_inline(text: &str, links: &dyn LinkResolver) -> RichText {
    let escaped = text
        .split('\n')
        .map(escape_block_start)
        .collect::<Vec<_>>()
        .join("\n");
    let markdown = preprocess_wikilinks(&escaped);
    let parser = Parser::new_ext(&markdown, Options::ENABLE_STRIKETHROUGH);

    let mut out = RichText::default();
    let mut annotations = Annotations::default();
    let mut link_stack: Vec<Option<String>> = Vec::new();
    let mut pending_break = false;

    for event in parser {
        let link = link_stack.iter().rev().find_map(|l| l.clone());
        match event {
            Event::Text(t) | Event::Html(t) | Event::InlineHtml(t) => {
                emit(&mut out, &t, annotations, link, &mut pending_break);
            }
            Event::Code(t) => {
                let code = Annotations {
                    code: true,
                    ..annotations
                };
                emit(&mut out, &t, code, link, &mut pending_break);
            }
            Event::SoftBreak | Event::HardBreak => {
                emit(&mut out, "\n", annotations, link, &mut pending_break);
            }
            Event::Start(Tag::Emphasis) => annotations.italic = true,
            Event::End(TagEnd::Emphasis) => annotations.italic = false,
            Event::Start(Tag::Strong) => annotations.bold = true,
            Event::End(TagEnd::Strong) => annotations.bold = false,
            Event::Start(Tag::Strikethrough) => annotations.strikethrough = true,
            Event::End(TagEnd::Strikethrough) => annotations.strikethrough = false,
            Event::Start(Tag::Link { dest_url, .. }) => {
                link_stack.push(resolve_destination(&dest_url, links));
            }
            Event::End(TagEnd::Link) => {
                link_stack.pop();
            }
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::BlockQuote(_)
                | TagEnd::CodeBlock,
            ) => pending_break = true,
            _ => {}
        }
    }

    trim_trailing_newlines(out)
}

fn emit(
    out: &mut RichText,
    content: &str,
    annotations: Annotations,
    link: Option<String>,
    pending_break: &mut bool,
) {
    if *pending_break && !out.is_empty() {
        out.push(TextSpan::plain("\n"));
    }
    *pending_break = false;
    out.push(TextSpan {
        content: content.to_string(),
        link,
        annotations,
    });
}

/// Escape a leading block marker so the line stays inline text.
///
/// Heading and list item text has already lost its own marker; a second
/// marker such as the `1.` in `# 1. Intro` must not start a list.
fn escape_block_start(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let (lead, rest) = line.split_at(indent);

    if rest.starts_with(['>', '#', '=']) {
        return format!("{}\\{}", lead, rest);
    }

    let mut chars = rest.chars();
    if let Some(marker @ ('-' | '+' | '*')) = chars.next()
        && chars.next().is_none_or(|c| c == ' ' || c == '\t')
    {
        return format!("{}\\{}{}", lead, marker, &rest[1..]);
    }

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        let after = &rest[digits..];
        if after.starts_with(['.', ')'])
            && after[1..].chars().next().is_none_or(|c| c == ' ' || c == '\t')
        {
            return format!("{}{}\\{}", lead, &rest[..digits], after);
        }
    }

    line.to_string()
}

fn resolve_destination(dest: &str, links: &dyn LinkResolver) -> Option<String> {
    if let Some(target) = dest.strip_prefix(WIKILINK_SCHEME) {
        let target = link_target(target);
        let resolved = links.resolve_link(target);
        if resolved.is_none() {
            log::debug!("Wikilink target not mirrored yet: {}", target);
        }
        return resolved;
    }
    if dest.starts_with("http://") || dest.starts_with("https://") || dest.starts_with("mailto:") {
        return Some(dest.to_string());
    }
    None
}

/// Strip heading/block suffixes: `Note#Heading` → `Note`
pub fn link_target(raw: &str) -> &str {
    raw.split('#').next().unwrap_or(raw).trim()
}

/// Rewrite wikilinks to `[label](<wikilink:target>)`; embeds become their label.
///
/// Matches inside inline code spans are left untouched.
pub fn preprocess_wikilinks(markdown: &str) -> String {
    let code_spans = code_span_ranges(markdown);
    let mut result = String::with_capacity(markdown.len());
    let mut last = 0;

    for caps in WIKILINK_RE.captures_iter(markdown) {
        let Some(full) = caps.get(0) else { continue };
        if code_spans.iter().any(|r| r.contains(&full.start())) {
            continue;
        }

        let is_embed = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let target = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        let alias = caps.get(3).map(|m| m.as_str().trim());
        let label = alias.unwrap_or(target);

        result.push_str(&markdown[last..full.start()]);
        if is_embed || target.contains('>') {
            result.push_str(&escape_label(label));
        } else {
            result.push_str(&format!("[{}](<{}{}>)", escape_label(label), WIKILINK_SCHEME, target));
        }
        last = full.end();
    }

    result.push_str(&markdown[last..]);
    result
}

fn escape_label(label: &str) -> String {
    label.replace('[', "\\[").replace(']', "\\]")
}

/// Byte ranges covered by backtick code spans
fn code_span_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - start;

        let mut j = i;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let close_start = j;
                while j < bytes.len() && bytes[j] == b'`' {
                    j += 1;
                }
                if j - close_start == run {
                    closed = Some(j);
                    break;
                }
            } else {
                j += 1;
            }
        }

        match closed {
            Some(end) => {
                ranges.push(start..end);
                i = end;
            }
            None => i = start + run,
        }
    }

    ranges
}

fn trim_trailing_newlines(text: RichText) -> RichText {
    let plain = text.to_plain_text();
    let trimmed_len = plain.trim_end_matches('\n').chars().count();
    if trimmed_len == text.char_len() {
        text
    } else {
        text.slice(0, trimmed_len)
    }
}
