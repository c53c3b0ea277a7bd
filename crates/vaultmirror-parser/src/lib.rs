//! # VaultMirror Parser
//!
//! Converts Obsidian flavored markdown into the ordered content blocks a
//! Notion-style workspace accepts.
//!
//! ## Architecture
//!
//! ### Block pass
//! - Frontmatter between `---` delimiters is split off and parsed as YAML
//! - Every remaining line is classified ([`lines::classify`]) and fed to a
//!   small state machine that tracks paragraphs and code fences
//!
//! ### Inline pass (`pulldown-cmark`)
//! - Paragraph, heading and list text is rendered into rich text spans
//! - Wikilinks `[[Note]]` become links when a [`LinkResolver`] knows the
//!   target, otherwise their label text
//!
//! ### Size policy
//! - Control characters are stripped
//! - Blocks longer than the configured limit are split into same-typed
//!   fragments, preferring line boundaries
//!
//! ## Quick Start
//!
//! ```
//! use vaultmirror_parser::{BlockConverter, NoLinks};
//! use vaultmirror_core::ContentBlock;
//!
//! let converter = BlockConverter::new(2000);
//! let doc = converter.convert_document("---\nstatus: draft\n---\n# Title\n\nHello", &NoLinks);
//!
//! assert_eq!(doc.metadata["status"], "draft");
//! assert_eq!(
//!     doc.blocks,
//!     vec![ContentBlock::heading(1, "Title"), ContentBlock::paragraph("Hello")]
//! );
//! ```

pub mod converter;
pub mod frontmatter;
pub mod inline;
pub mod language;
pub mod limits;
pub mod lines;

pub use converter::{BlockConverter, ConvertedDocument, convert};
pub use frontmatter::extract_frontmatter;
pub use inline::{LinkResolver, NoLinks, link_target, render_inline};
pub use language::normalize_language;
pub use limits::{sanitize_block, split_block};
