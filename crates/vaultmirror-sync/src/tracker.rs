//! Change tracking by content fingerprint.
//!
//! Modification time is only a pre-filter: a document whose mtime is older
//! than the moment its synced content was read is reported unchanged without
//! being read again, and any later mtime still needs a content hash mismatch
//! to count as a change.

use std::collections::{BTreeMap, HashSet};
use vaultmirror_core::{DocumentRef, Fingerprint, SyncMetadata, SyncRecord};
use vaultmirror_vault::VaultSource;

/// Result of checking one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Never synced before; content is attached when it could be read
    New(Option<String>),
    /// Content differs from the last sync, or could not be read
    Changed(Option<String>),
    /// Same content as the last sync
    Unchanged,
}

impl Detection {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Content read while detecting, if any
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::New(content) | Self::Changed(content) => content,
            Self::Unchanged => None,
        }
    }
}

/// Fingerprint store deciding whether a document needs a re-sync
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    records: BTreeMap<String, SyncRecord>,
    trust_mtime: bool,
}

impl ChangeTracker {
    /// Tracker seeded with persisted records
    pub fn new(records: BTreeMap<String, SyncRecord>, trust_mtime: bool) -> Self {
        Self {
            records,
            trust_mtime,
        }
    }

    pub fn record(&self, path: &str) -> Option<&SyncRecord> {
        self.records.get(path)
    }

    pub fn records(&self) -> &BTreeMap<String, SyncRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decide whether `doc` changed, reading it through `source` if needed.
    ///
    /// Read failures are reported as [`Detection::Changed`] without content
    /// so the document is retried rather than silently skipped.
    pub async fn detect(&self, doc: &DocumentRef, source: &dyn VaultSource) -> Detection {
        let Some(record) = self.records.get(&doc.path) else {
            return Detection::New(source.read_content(doc).await.ok());
        };

        if self.trust_mtime
            && let Some(modified) = doc.modified_at_millis
            && modified < record.fingerprint.last_synced_at_epoch_millis
        {
            return Detection::Unchanged;
        }

        match source.read_content(doc).await {
            Ok(content) if record.fingerprint.matches(&content) => Detection::Unchanged,
            Ok(content) => Detection::Changed(Some(content)),
            Err(e) => {
                log::debug!("Could not read {} for change detection: {}", doc.path, e);
                Detection::Changed(None)
            }
        }
    }

    /// Whether `doc` needs a re-sync
    pub async fn has_changed(&self, doc: &DocumentRef, source: &dyn VaultSource) -> bool {
        self.detect(doc, source).await.is_changed()
    }

    /// Whether `content` differs from the last synced content of `path`
    pub fn content_changed(&self, path: &str, content: &str) -> bool {
        self.records
            .get(path)
            .is_none_or(|record| !record.fingerprint.matches(content))
    }

    /// Record a successful upsert of `doc` with `content`.
    ///
    /// `read_at_millis` is when the content was read, not when the write finished.
    pub fn commit(&mut self, doc: &DocumentRef, content: &str, metadata: SyncMetadata, read_at_millis: i64) {
        self.records.insert(
            doc.path.clone(),
            SyncRecord {
                fingerprint: Fingerprint::new(content, read_at_millis),
                metadata,
            },
        );
    }

    /// Drop records for paths missing from `existing_paths`; returns the
    /// removed paths
    pub fn prune_deleted(&mut self, existing_paths: &HashSet<String>) -> Vec<String> {
        let removed: Vec<String> = self
            .records
            .keys()
            .filter(|path| !existing_paths.contains(*path))
            .cloned()
            .collect();
        for path in &removed {
            self.records.remove(path);
        }
        removed
    }

    pub fn into_records(self) -> BTreeMap<String, SyncRecord> {
        self.records
    }
}
