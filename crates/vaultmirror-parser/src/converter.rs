//! Document → content block conversion.
//!
//! A single left-to-right scan over lines. The converter state is either
//! prose (with an optional open paragraph) or an open code fence; each line
//! is classified by [`crate::lines::classify`] and then acted on.

use crate::frontmatter::extract_frontmatter;
use crate::inline::{LinkResolver, NoLinks, render_inline};
use crate::language::normalize_language;
use crate::limits::{sanitize_block, split_block};
use crate::lines::{Line, classify, is_fence};
use vaultmirror_core::{ContentBlock, DEFAULT_MAX_BLOCK_CHARS, SyncMetadata};

/// Output of converting one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    /// Frontmatter, sent as page properties
    pub metadata: SyncMetadata,
    /// Ordered content blocks, each within the size limit
    pub blocks: Vec<ContentBlock>,
}

enum State<'a> {
    Prose { paragraph: Vec<&'a str> },
    Fence { language: &'static str, lines: Vec<&'a str> },
}

/// Converts markdown documents into remote content blocks
#[derive(Debug, Clone)]
pub struct BlockConverter {
    max_block_chars: usize,
}

impl Default for BlockConverter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOCK_CHARS)
    }
}

impl BlockConverter {
    /// Converter enforcing `max_block_chars` per block
    pub fn new(max_block_chars: usize) -> Self {
        Self {
            max_block_chars: max_block_chars.max(1),
        }
    }

    pub fn max_block_chars(&self) -> usize {
        self.max_block_chars
    }

    /// Extract frontmatter and convert the remaining body
    pub fn convert_document(&self, raw: &str, links: &dyn LinkResolver) -> ConvertedDocument {
        let (metadata, body) = extract_frontmatter(raw);
        ConvertedDocument {
            metadata,
            blocks: self.convert(body, links),
        }
    }

    /// Convert body text (without frontmatter) into blocks
    pub fn convert(&self, body: &str, links: &dyn LinkResolver) -> Vec<ContentBlock> {
        let mut emitter = Emitter {
            blocks: Vec::new(),
            limit: self.max_block_chars,
            links,
        };
        let mut state = State::Prose {
            paragraph: Vec::new(),
        };

        for line in body.lines() {
            state = match state {
                State::Fence { language, mut lines } => {
                    if is_fence(line) {
                        emitter.code(language, &lines);
                        State::Prose {
                            paragraph: Vec::new(),
                        }
                    } else {
                        lines.push(line);
                        State::Fence { language, lines }
                    }
                }
                State::Prose { mut paragraph } => match classify(line) {
                    Line::Text { text } => {
                        paragraph.push(text);
                        State::Prose { paragraph }
                    }
                    other => {
                        emitter.paragraph(&paragraph);
                        paragraph.clear();
                        match other {
                            Line::Fence { info } => State::Fence {
                                language: normalize_language(info),
                                lines: Vec::new(),
                            },
                            Line::Heading { level, text } => {
                                emitter.heading(level, text);
                                State::Prose { paragraph }
                            }
                            Line::Bullet { text } => {
                                emitter.bullet(text);
                                State::Prose { paragraph }
                            }
                            Line::Numbered { text } => {
                                emitter.numbered(text);
                                State::Prose { paragraph }
                            }
                            Line::Divider => {
                                emitter.push(ContentBlock::Divider);
                                State::Prose { paragraph }
                            }
                            Line::Blank | Line::Text { .. } => State::Prose { paragraph },
                        }
                    }
                },
            };
        }

        match state {
            State::Prose { paragraph } => emitter.paragraph(&paragraph),
            State::Fence { language, lines } => {
                log::debug!("Unterminated code fence at end of document; keeping its content");
                emitter.code(language, &lines);
            }
        }

        emitter.blocks
    }
}

/// Collects blocks, applying sanitizing and the size policy on the way in
struct Emitter<'l> {
    blocks: Vec<ContentBlock>,
    limit: usize,
    links: &'l dyn LinkResolver,
}

impl Emitter<'_> {
    fn push(&mut self, block: ContentBlock) {
        let block = sanitize_block(block);
        self.blocks.extend(split_block(block, self.limit));
    }

    fn paragraph(&mut self, lines: &[&str]) {
        if lines.is_empty() {
            return;
        }
        let text = render_inline(&lines.join("\n"), self.links);
        if !text.is_empty() {
            self.push(ContentBlock::Paragraph { text });
        }
    }

    fn heading(&mut self, level: u8, text: &str) {
        let text = render_inline(text, self.links);
        if !text.is_empty() {
            self.push(ContentBlock::Heading { level, text });
        }
    }

    fn bullet(&mut self, text: &str) {
        let text = render_inline(text, self.links);
        if !text.is_empty() {
            self.push(ContentBlock::BulletItem { text });
        }
    }

    fn numbered(&mut self, text: &str) {
        let text = render_inline(text, self.links);
        if !text.is_empty() {
            self.push(ContentBlock::NumberedItem { text });
        }
    }

    fn code(&mut self, language: &str, lines: &[&str]) {
        self.push(ContentBlock::code(language, lines.join("\n")));
    }
}

/// Convert a full document with the default size limit and no link targets
pub fn convert(raw: &str) -> ConvertedDocument {
    BlockConverter::default().convert_document(raw, &NoLinks)
}
