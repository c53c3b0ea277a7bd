//! Sync pass orchestration.
//!
//! A pass moves through Connecting → ResolvingStructure → one
//! Detecting/Converting/Writing/Committing cycle per document. Only a
//! Connecting failure (or a vault that cannot be enumerated) aborts the
//! pass; every other failure is isolated to one folder or one document and
//! summarized in the [`SyncReport`].

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;
use vaultmirror_core::{
    ContentBlock, DocumentError, DocumentOutcome, DocumentRef, Error, MirrorConfig, MirrorState, NodeId,
    PassStatus, RemoteErrorKind, Result, RetryConfig, SyncCounts, SyncMetadata, SyncMode,
    SyncReport, SyncSettings, folder_prefixes, path_depth,
};
use vaultmirror_parser::BlockConverter;
use vaultmirror_remote::{RemoteClient, list_all_children};
use vaultmirror_vault::VaultSource;

use crate::resolver::{NodeResolver, RemoteNodeCache};
use crate::tracker::ChangeTracker;
use crate::transport::BlockWriter;

/// Settings a sync engine needs from the mirror configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub root_page_id: String,
    pub excluded_paths: Vec<String>,
    pub sync: SyncSettings,
    pub retry: RetryConfig,
}

impl EngineSettings {
    pub fn new(root_page_id: impl Into<String>) -> Self {
        Self {
            root_page_id: root_page_id.into(),
            excluded_paths: Vec::new(),
            sync: SyncSettings::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl From<&MirrorConfig> for EngineSettings {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            root_page_id: config.root_page_id.clone(),
            excluded_paths: config.excluded_paths.clone(),
            sync: config.sync.clone(),
            retry: config.retry.clone(),
        }
    }
}

/// Accumulates per-document outcomes into a report
struct PassLog {
    mode: SyncMode,
    started: Instant,
    counts: SyncCounts,
    errors: Vec<DocumentError>,
    error_total: usize,
    structural_warnings: usize,
    max_errors: usize,
}

impl PassLog {
    fn new(mode: SyncMode, max_errors: usize) -> Self {
        Self {
            mode,
            started: Instant::now(),
            counts: SyncCounts::default(),
            errors: Vec::new(),
            error_total: 0,
            structural_warnings: 0,
            max_errors,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn error(&mut self, path: &str, error: &Error) {
        self.error_total += 1;
        if self.errors.len() < self.max_errors {
            self.errors.push(DocumentError {
                path: path.to_string(),
                message: error.to_string(),
            });
        }
    }

    fn fatal(&self, reason: String) -> SyncReport {
        log::error!("{} sync aborted: {}", self.mode, reason);
        SyncReport::fatal(self.mode, reason, self.elapsed_ms())
    }

    fn finish(self) -> SyncReport {
        let status = if self.counts.failed == 0 && self.error_total == 0 {
            PassStatus::Success
        } else {
            PassStatus::PartialFailure
        };
        let duration_ms = self.elapsed_ms();
        SyncReport {
            mode: self.mode,
            counts: self.counts,
            errors: self.errors,
            structural_warnings: self.structural_warnings,
            status,
            duration_ms,
        }
    }
}

/// The incremental mirror synchronization engine.
///
/// Owns the change tracker and the remote node cache for its whole
/// lifetime. Passes take `&mut self`, so two passes can never interleave on
/// the same engine.
pub struct SyncEngine {
    vault: Arc<dyn VaultSource>,
    remote: Arc<dyn RemoteClient>,
    settings: EngineSettings,
    converter: BlockConverter,
    tracker: ChangeTracker,
    cache: RemoteNodeCache,
    last_pass_at: Option<i64>,
}

impl SyncEngine {
    pub fn new(
        vault: Arc<dyn VaultSource>,
        remote: Arc<dyn RemoteClient>,
        settings: EngineSettings,
    ) -> Self {
        let converter = BlockConverter::new(settings.sync.max_block_chars);
        let tracker = ChangeTracker::new(Default::default(), settings.sync.trust_mtime);
        Self {
            vault,
            remote,
            settings,
            converter,
            tracker,
            cache: RemoteNodeCache::default(),
            last_pass_at: None,
        }
    }

    /// Seed fingerprints and cached nodes from persisted state.
    ///
    /// Cached nodes are dropped when the state belongs to another root page.
    pub fn with_state(mut self, state: MirrorState) -> Self {
        let same_root =
            state.root_page_id.is_empty() || state.root_page_id == self.settings.root_page_id;
        if !same_root {
            log::warn!(
                "Saved state belongs to root page {}; ignoring its node cache",
                state.root_page_id
            );
        }

        self.tracker = ChangeTracker::new(state.fingerprints, self.settings.sync.trust_mtime);
        self.cache = if same_root {
            RemoteNodeCache::new(state.nodes)
        } else {
            RemoteNodeCache::default()
        };
        self.last_pass_at = state.last_pass_at;
        self
    }

    /// Snapshot of the state to persist
    pub fn state(&self) -> MirrorState {
        MirrorState {
            root_page_id: self.settings.root_page_id.clone(),
            fingerprints: self.tracker.records().clone(),
            nodes: self.cache.entries().clone(),
            last_pass_at: self.last_pass_at,
            ..MirrorState::default()
        }
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn cache(&self) -> &RemoteNodeCache {
        &self.cache
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Sync new and changed documents
    #[instrument(skip(self), fields(root = %self.settings.root_page_id), name = "incremental_sync")]
    pub async fn run_incremental_sync(&mut self) -> SyncReport {
        self.run_pass(SyncMode::Incremental).await
    }

    /// Archive everything under the root and recreate every document
    #[instrument(skip(self), fields(root = %self.settings.root_page_id), name = "full_resync")]
    pub async fn run_full_resync(&mut self) -> SyncReport {
        self.run_pass(SyncMode::FullResync).await
    }

    async fn run_pass(&mut self, mode: SyncMode) -> SyncReport {
        let mut pass = PassLog::new(mode, self.settings.sync.max_reported_errors);
        log::info!("Starting {} sync", mode);

        // Connecting
        if let Err(reason) = self.connect().await {
            return pass.fatal(reason);
        }

        let documents = match self
            .vault
            .enumerate_documents(&self.settings.excluded_paths)
            .await
        {
            Ok(documents) => documents,
            Err(e) => return pass.fatal(format!("cannot enumerate vault: {}", e)),
        };
        log::info!("{} documents in vault", documents.len());

        self.prune(&documents).await;

        if mode == SyncMode::FullResync {
            self.wipe_root(&mut pass).await;
        }

        // ResolvingStructure
        pass.structural_warnings += self.resolve_structure(&documents).await;

        // PerDocument
        for doc in &documents {
            match self.sync_document(doc).await {
                Ok(outcome) => {
                    log::debug!("{}: {:?}", doc.path, outcome);
                    pass.counts.record(outcome);
                }
                Err(e) => {
                    log::warn!("Failed to sync {}: {}", doc.path, e);
                    pass.counts.failed += 1;
                    pass.error(&doc.path, &e);
                }
            }
        }

        self.last_pass_at = Some(chrono::Utc::now().timestamp_millis());
        let report = pass.finish();
        log::info!("{}", report);
        report
    }

    /// Verify the root node is reachable with the configured credential
    async fn connect(&self) -> std::result::Result<(), String> {
        let root = &self.settings.root_page_id;
        match self.remote.get_node(root).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(format!(
                "root page {} does not exist or is not shared with the integration",
                root
            )),
            Err(e) if e.remote_kind() == Some(RemoteErrorKind::Unauthorized) => {
                Err(format!("credential rejected: {}", e))
            }
            Err(e) => Err(format!("remote unreachable: {}", e)),
        }
    }

    /// Drop fingerprints and cached nodes of paths that no longer exist
    async fn prune(&mut self, documents: &[DocumentRef]) {
        let doc_paths: HashSet<String> = documents.iter().map(|d| d.path.clone()).collect();
        let removed_docs: HashSet<String> =
            self.tracker.prune_deleted(&doc_paths).into_iter().collect();

        let mut live = doc_paths;
        for doc in documents {
            live.extend(folder_prefixes(&doc.parent_path));
        }
        let stale = self.cache.retain_paths(&live);

        if !removed_docs.is_empty() || !stale.is_empty() {
            log::info!(
                "Pruned {} deleted documents and {} cached nodes",
                removed_docs.len(),
                stale.len()
            );
        }

        if self.settings.sync.archive_deleted {
            let ids: Vec<NodeId> = stale
                .into_iter()
                .filter(|(path, _)| removed_docs.contains(path))
                .map(|(_, id)| id)
                .collect();
            if !ids.is_empty() {
                let failures = self
                    .writer()
                    .archive_all(&ids, self.settings.sync.delete_batch_size)
                    .await;
                for (id, e) in failures {
                    log::warn!("Could not archive deleted page {}: {}", id, e);
                }
            }
        }
    }

    /// Archive every child of the root and forget all cached nodes
    async fn wipe_root(&mut self, pass: &mut PassLog) {
        let root = self.settings.root_page_id.as_str();
        let remote = self.remote.as_ref();
        let writer = self.writer();

        let children = match writer
            .call(|| Box::pin(async move { list_all_children(remote, root).await }))
            .await
        {
            Ok(children) => children,
            Err(e) => {
                log::warn!("Could not list root children for wipe: {}", e);
                pass.error(root, &e);
                Vec::new()
            }
        };

        let ids: Vec<NodeId> = children.into_iter().map(|c| c.id).collect();
        log::info!("Archiving {} existing root children", ids.len());
        for (id, e) in writer
            .archive_all(&ids, self.settings.sync.delete_batch_size)
            .await
        {
            log::warn!("Could not archive {}: {}", id, e);
            pass.error(&id, &e);
        }

        self.cache.clear();
    }

    /// Ensure every folder of the vault exists, parents first.
    ///
    /// Returns how many folders fell back to the root.
    async fn resolve_structure(&mut self, documents: &[DocumentRef]) -> usize {
        let folders: BTreeSet<String> = documents
            .iter()
            .flat_map(|d| folder_prefixes(&d.parent_path))
            .collect();
        let mut folders: Vec<String> = folders.into_iter().collect();
        folders.sort_by(|a, b| path_depth(a).cmp(&path_depth(b)).then_with(|| a.cmp(b)));

        let document_ids: Vec<NodeId> = documents
            .iter()
            .filter_map(|d| self.cache.get(&d.path).cloned())
            .collect();
        let resolver = NodeResolver::new(
            self.remote.as_ref(),
            &self.settings.root_page_id,
            &self.settings.retry,
        )
        .with_document_ids(document_ids);

        let mut fallbacks = 0;
        for folder in &folders {
            if resolver
                .ensure_folder_chain(&mut self.cache, folder)
                .await
                .fell_back
            {
                fallbacks += 1;
            }
        }
        fallbacks
    }

    fn writer(&self) -> BlockWriter<'_> {
        writer_for(self.remote.as_ref(), &self.settings)
    }

    async fn sync_document(&mut self, doc: &DocumentRef) -> Result<DocumentOutcome> {
        // Detecting
        // Taken before any read: a save landing after it shows up as newer next pass
        let read_at = chrono::Utc::now().timestamp_millis();
        let cached = self.cache.get(&doc.path).cloned();
        let detection = self.tracker.detect(doc, self.vault.as_ref()).await;
        if !detection.is_changed() && cached.is_some() {
            return Ok(DocumentOutcome::Unchanged);
        }

        // Converting
        let content = match detection.into_content() {
            Some(content) => content,
            None => self.vault.read_content(doc).await?,
        };
        let converted = self.converter.convert_document(&content, &self.cache);
        let properties = if self.settings.sync.sync_properties {
            converted.metadata.clone()
        } else {
            SyncMetadata::new()
        };

        // Writing
        let (node_id, outcome) = match cached {
            Some(node_id) => {
                let updated = self
                    .update_page(&node_id, doc, &properties, &converted.blocks)
                    .await;
                match updated {
                    Ok(()) => (node_id, DocumentOutcome::Updated),
                    Err(e) if e.remote_kind() == Some(RemoteErrorKind::NotFound) => {
                        log::warn!("Page for {} vanished remotely; recreating it", doc.path);
                        self.cache.remove(&doc.path);
                        let id = self
                            .create_page(doc, &properties, &converted.blocks)
                            .await?;
                        (id, DocumentOutcome::Created)
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                let id = self
                    .create_page(doc, &properties, &converted.blocks)
                    .await?;
                (id, DocumentOutcome::Created)
            }
        };

        // Committing
        self.cache.insert(doc.path.clone(), node_id);
        self.tracker.commit(doc, &content, converted.metadata, read_at);
        Ok(outcome)
    }

    async fn update_page(
        &self,
        node_id: &str,
        doc: &DocumentRef,
        properties: &SyncMetadata,
        blocks: &[ContentBlock],
    ) -> Result<()> {
        let writer = self.writer();
        if self.settings.sync.sync_properties {
            let remote = self.remote.as_ref();
            let title = doc.display_name.as_str();
            writer
                .call(|| {
                    Box::pin(async move { remote.update_properties(node_id, title, properties).await })
                })
                .await?;
        }
        writer.replace_content(node_id, blocks).await
    }

    async fn create_page(
        &mut self,
        doc: &DocumentRef,
        properties: &SyncMetadata,
        blocks: &[ContentBlock],
    ) -> Result<NodeId> {
        let resolver = NodeResolver::new(
            self.remote.as_ref(),
            &self.settings.root_page_id,
            &self.settings.retry,
        );
        // A fallback here was already counted while resolving folders
        let parent = resolver.parent_for(&self.cache, &doc.parent_path);

        let writer = writer_for(self.remote.as_ref(), &self.settings);
        let (node_id, sent) = writer
            .create_page(&parent.node_id, &doc.display_name, properties, blocks)
            .await?;

        // Cached before appending: a failed append becomes an update next pass
        self.cache.insert(doc.path.clone(), node_id.clone());
        writer.append_all(&node_id, &blocks[sent..]).await?;
        Ok(node_id)
    }
}

fn writer_for<'a>(remote: &'a dyn RemoteClient, settings: &'a EngineSettings) -> BlockWriter<'a> {
    BlockWriter::new(
        remote,
        &settings.retry,
        settings.sync.batch_size,
        settings.sync.request_delay(),
    )
}
