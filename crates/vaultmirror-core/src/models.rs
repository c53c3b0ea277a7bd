//! Core data models for the mirror.
//!
//! These types are shared by every crate: the vault side produces
//! [`DocumentRef`]s, the parser produces [`ContentBlock`]s, the remote side
//! consumes blocks and reports [`ChildSummary`]s, and the sync engine keeps
//! [`Fingerprint`]s and emits a [`SyncReport`] per pass.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier of a node (page or block) in the remote workspace.
pub type NodeId = String;

/// Frontmatter key/value pairs attached to a remote page as properties.
pub type SyncMetadata = BTreeMap<String, String>;

// ============================================================================
// Documents
// ============================================================================

/// A document enumerated from the vault.
///
/// Paths are vault-relative and always use `/` as separator. Ordering is by
/// path, which gives parents before children for any shared prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Vault-relative path, e.g. `Projects/Alpha/Plan.md`
    pub path: String,
    /// Page title, normally the file stem
    pub display_name: String,
    /// Vault-relative folder path, empty for documents at the vault root
    pub parent_path: String,
    /// Last modification time, if the source can report one
    pub modified_at_millis: Option<i64>,
    /// Size in bytes
    pub size: u64,
}

impl DocumentRef {
    /// Build a reference from a vault-relative path, deriving name and parent
    pub fn from_path(path: impl Into<String>, modified_at_millis: Option<i64>, size: u64) -> Self {
        let path = path.into();
        let (parent_path, file_name) = match path.rfind('/') {
            Some(idx) => (path[..idx].to_string(), &path[idx + 1..]),
            None => (String::new(), path.as_str()),
        };
        let display_name = match file_name.rfind('.') {
            Some(idx) if idx > 0 => file_name[..idx].to_string(),
            _ => file_name.to_string(),
        };

        Self {
            path,
            display_name,
            parent_path,
            modified_at_millis,
            size,
        }
    }

    /// Whether the document lives directly in the vault root
    pub fn is_top_level(&self) -> bool {
        self.parent_path.is_empty()
    }
}

/// Every ancestor folder of a `/`-separated folder path, shortest first.
///
/// `"A/B/C"` yields `["A", "A/B", "A/B/C"]`; the empty path yields nothing.
pub fn folder_prefixes(path: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}

/// Number of segments in a `/`-separated path
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

// ============================================================================
// Fingerprints
// ============================================================================

/// Content hash plus the time of the last successful upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// 128-bit content digest, lowercase hex
    pub content_hash: String,
    /// Milliseconds since the Unix epoch
    pub last_synced_at_epoch_millis: i64,
}

impl Fingerprint {
    /// Fingerprint for content synced at `now_millis`
    pub fn new(content: &str, now_millis: i64) -> Self {
        Self {
            content_hash: Self::hash_content(content),
            last_synced_at_epoch_millis: now_millis,
        }
    }

    /// SHA-256 truncated to 128 bits, hex encoded
    pub fn hash_content(content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Whether `content` hashes to the stored digest
    pub fn matches(&self, content: &str) -> bool {
        self.content_hash == Self::hash_content(content)
    }
}

// ============================================================================
// Content blocks
// ============================================================================

/// Inline formatting flags of a text span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl Annotations {
    /// No formatting at all
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A run of text with uniform formatting and an optional hyperlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl TextSpan {
    /// Unformatted, unlinked text
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: None,
            annotations: Annotations::default(),
        }
    }

    /// Unformatted text linking to `url`
    pub fn linked(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: Some(url.into()),
            annotations: Annotations::default(),
        }
    }

    fn same_style(&self, other: &TextSpan) -> bool {
        self.link == other.link && self.annotations == other.annotations
    }
}

/// Ordered sequence of text spans.
///
/// The serialized length of a block is the character count of the
/// concatenated span contents; the size policy in the parser is defined
/// against [`RichText::char_len`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub spans: Vec<TextSpan>,
}

impl RichText {
    /// Single plain span; empty input yields no spans
    pub fn plain(content: impl Into<String>) -> Self {
        let content = content.into();
        if content.is_empty() {
            Self::default()
        } else {
            Self {
                spans: vec![TextSpan::plain(content)],
            }
        }
    }

    /// Append a span, merging it into the previous one when styles match
    pub fn push(&mut self, span: TextSpan) {
        if span.content.is_empty() {
            return;
        }
        if let Some(last) = self.spans.last_mut()
            && last.same_style(&span)
        {
            last.content.push_str(&span.content);
            return;
        }
        self.spans.push(span);
    }

    /// Concatenated text without formatting
    pub fn to_plain_text(&self) -> String {
        self.spans.iter().map(|s| s.content.as_str()).collect()
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.spans.iter().map(|s| s.content.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.content.is_empty())
    }

    /// Characters in `[start, end)` with span styles preserved
    pub fn slice(&self, start: usize, end: usize) -> RichText {
        let mut out = RichText::default();
        let mut offset = 0;
        for span in &self.spans {
            let len = span.content.chars().count();
            let span_start = offset;
            let span_end = offset + len;
            offset = span_end;

            if span_end <= start || span_start >= end {
                continue;
            }
            let from = start.saturating_sub(span_start);
            let to = end.min(span_end) - span_start;
            let content: String = span.content.chars().skip(from).take(to - from).collect();
            out.push(TextSpan {
                content,
                link: span.link.clone(),
                annotations: span.annotations,
            });
        }
        out
    }

    /// Apply `f` to every span's content, dropping spans that end up empty
    pub fn map_content(self, f: impl Fn(&str) -> String) -> RichText {
        let mut out = RichText::default();
        for span in self.spans {
            out.push(TextSpan {
                content: f(&span.content),
                link: span.link,
                annotations: span.annotations,
            });
        }
        out
    }
}

impl From<&str> for RichText {
    fn from(value: &str) -> Self {
        RichText::plain(value)
    }
}

/// One typed unit of document content in the remote's block model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Heading, level 1 to 3
    Heading { level: u8, text: RichText },
    /// Paragraph of text (may span several source lines)
    Paragraph { text: RichText },
    /// One bulleted list item
    BulletItem { text: RichText },
    /// One numbered list item
    NumberedItem { text: RichText },
    /// Fenced code; `language` is a remote language identifier
    CodeBlock { language: String, text: String },
    /// Horizontal rule
    Divider,
}

impl ContentBlock {
    /// Heading with plain text; levels outside 1..=3 are clamped
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            level: level.clamp(1, 3),
            text: RichText::plain(text.into()),
        }
    }

    /// Paragraph with plain text
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph {
            text: RichText::plain(text.into()),
        }
    }

    /// Code block
    pub fn code(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CodeBlock {
            language: language.into(),
            text: text.into(),
        }
    }

    /// Length of the block's text as the remote counts it
    pub fn text_len(&self) -> usize {
        match self {
            Self::Heading { text, .. }
            | Self::Paragraph { text }
            | Self::BulletItem { text }
            | Self::NumberedItem { text } => text.char_len(),
            Self::CodeBlock { text, .. } => text.chars().count(),
            Self::Divider => 0,
        }
    }

    /// Block text without formatting
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Heading { text, .. }
            | Self::Paragraph { text }
            | Self::BulletItem { text }
            | Self::NumberedItem { text } => text.to_plain_text(),
            Self::CodeBlock { text, .. } => text.clone(),
            Self::Divider => String::new(),
        }
    }

    /// Short name of the block type, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Heading { .. } => "heading",
            Self::Paragraph { .. } => "paragraph",
            Self::BulletItem { .. } => "bullet_item",
            Self::NumberedItem { .. } => "numbered_item",
            Self::CodeBlock { .. } => "code_block",
            Self::Divider => "divider",
        }
    }
}

// ============================================================================
// Remote listings
// ============================================================================

/// Summary of one child of a remote node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSummary {
    pub id: NodeId,
    /// Title for pages, empty for content blocks
    pub title: String,
    /// True for pages (nodes that can contain other nodes)
    pub is_container: bool,
}

/// One page of a paginated child listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildPage {
    pub children: Vec<ChildSummary>,
    /// Cursor for the next page, `None` when this is the last page
    pub next_cursor: Option<String>,
}

// ============================================================================
// Pass reports
// ============================================================================

/// Kind of sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Only changed or new documents are written
    Incremental,
    /// Remote root is wiped and every document is recreated
    FullResync,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incremental => f.write_str("incremental"),
            Self::FullResync => f.write_str("full resync"),
        }
    }
}

/// What happened to one document during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Per-document counts for a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncCounts {
    /// Count one successful outcome
    pub fn record(&mut self, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Created => self.created += 1,
            DocumentOutcome::Updated => self.updated += 1,
            DocumentOutcome::Unchanged => self.skipped += 1,
        }
    }

    /// Documents that were written to the remote
    pub fn written(&self) -> usize {
        self.created + self.updated
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }
}

/// A failure isolated to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentError {
    pub path: String,
    pub message: String,
}

/// Final status of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassStatus {
    /// Every document was created, updated or skipped
    Success,
    /// At least one document failed; the rest of the pass completed
    PartialFailure,
    /// The pass aborted before any document was processed
    FatalFailure { reason: String },
}

/// Structured summary returned by every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub counts: SyncCounts,
    /// First N per-document errors, in processing order
    pub errors: Vec<DocumentError>,
    /// Folders that fell back to the root node
    pub structural_warnings: usize,
    pub status: PassStatus,
    pub duration_ms: u64,
}

impl SyncReport {
    /// Report for a pass that aborted before processing documents
    pub fn fatal(mode: SyncMode, reason: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            mode,
            counts: SyncCounts::default(),
            errors: Vec::new(),
            structural_warnings: 0,
            status: PassStatus::FatalFailure {
                reason: reason.into(),
            },
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PassStatus::Success
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.status, PassStatus::FatalFailure { .. })
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            PassStatus::FatalFailure { reason } => {
                write!(f, "{} sync aborted: {}", self.mode, reason)
            }
            status => {
                write!(
                    f,
                    "{} sync {}: {} created, {} updated, {} unchanged, {} failed in {} ms",
                    self.mode,
                    if *status == PassStatus::Success {
                        "complete"
                    } else {
                        "completed with failures"
                    },
                    self.counts.created,
                    self.counts.updated,
                    self.counts.skipped,
                    self.counts.failed,
                    self.duration_ms
                )
            }
        }
    }
}
