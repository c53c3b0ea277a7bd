//! Remote node cache and folder resolution.
//!
//! The cache maps vault-relative paths (folders and documents alike) to
//! remote node ids. It is owned by the sync engine and passed explicitly to
//! the resolver; there is no global state.

use std::collections::{BTreeMap, HashSet};
use vaultmirror_core::resilience::retry_with_backoff;
use vaultmirror_core::{NodeId, RetryConfig, SyncMetadata, folder_prefixes};
use vaultmirror_parser::LinkResolver;
use vaultmirror_remote::{RemoteClient, list_all_children, page_url};

/// Path → remote node id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteNodeCache {
    nodes: BTreeMap<String, NodeId>,
}

impl RemoteNodeCache {
    pub fn new(nodes: BTreeMap<String, NodeId>) -> Self {
        Self { nodes }
    }

    pub fn get(&self, path: &str) -> Option<&NodeId> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, id: impl Into<NodeId>) {
        self.nodes.insert(path.into(), id.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<NodeId> {
        self.nodes.remove(path)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keep only entries whose path is in `live_paths`; returns the removed
    /// entries
    pub fn retain_paths(&mut self, live_paths: &HashSet<String>) -> Vec<(String, NodeId)> {
        let stale: Vec<String> = self
            .nodes
            .keys()
            .filter(|path| !live_paths.contains(*path))
            .cloned()
            .collect();
        stale
            .into_iter()
            .filter_map(|path| self.nodes.remove(&path).map(|id| (path, id)))
            .collect()
    }

    pub fn entries(&self) -> &BTreeMap<String, NodeId> {
        &self.nodes
    }

    pub fn into_entries(self) -> BTreeMap<String, NodeId> {
        self.nodes
    }

    /// Cached document for a link target.
    ///
    /// Tries the exact path, then the path with `.md`, then any document
    /// whose file stem matches (shortest path wins, as Obsidian resolves).
    pub fn find_document(&self, target: &str) -> Option<&NodeId> {
        let target = target.trim().trim_start_matches('/');
        if target.is_empty() {
            return None;
        }

        if let Some(id) = self.nodes.get(target) {
            return Some(id);
        }
        if let Some(id) = self.nodes.get(&format!("{}.md", target)) {
            return Some(id);
        }

        let wanted = target.to_lowercase();
        self.nodes
            .iter()
            .filter_map(|(path, id)| {
                let stem = path.strip_suffix(".md")?;
                let name = stem.rsplit('/').next().unwrap_or(stem);
                (name.to_lowercase() == wanted || stem.to_lowercase() == wanted)
                    .then_some((path, id))
            })
            .min_by_key(|(path, _)| (path.matches('/').count(), path.len()))
            .map(|(_, id)| id)
    }
}

impl LinkResolver for RemoteNodeCache {
    fn resolve_link(&self, target: &str) -> Option<String> {
        self.find_document(target).map(|id| page_url(id))
    }
}

/// Outcome of ensuring a folder chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderResolution {
    /// Node that documents in the folder are created under
    pub node_id: NodeId,
    /// True when the folder could not be resolved and the root is used
    pub fell_back: bool,
}

/// Maps folder paths to remote nodes, creating the ones that are missing
pub struct NodeResolver<'a> {
    client: &'a dyn RemoteClient,
    root_id: &'a str,
    retry: &'a RetryConfig,
    document_ids: HashSet<NodeId>,
}

impl<'a> NodeResolver<'a> {
    pub fn new(client: &'a dyn RemoteClient, root_id: &'a str, retry: &'a RetryConfig) -> Self {
        Self {
            client,
            root_id,
            retry,
            document_ids: HashSet::new(),
        }
    }

    /// Pages known to hold documents; never reused as folders
    pub fn with_document_ids(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.document_ids = ids.into_iter().collect();
        self
    }

    /// Cached node of `path`; the empty path is the root
    pub fn resolve(&self, cache: &RemoteNodeCache, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(self.root_id.to_string());
        }
        cache.get(path).cloned()
    }

    /// Node a document in `parent_path` is created under, falling back to
    /// the root when the folder is unknown
    pub fn parent_for(&self, cache: &RemoteNodeCache, parent_path: &str) -> FolderResolution {
        match self.resolve(cache, parent_path) {
            Some(node_id) => FolderResolution {
                node_id,
                fell_back: false,
            },
            None => {
                log::warn!(
                    "Folder '{}' is not resolved; placing document under the root",
                    parent_path
                );
                self.root_fallback()
            }
        }
    }

    fn root_fallback(&self) -> FolderResolution {
        FolderResolution {
            node_id: self.root_id.to_string(),
            fell_back: true,
        }
    }

    /// Make sure every folder along `path` exists remotely.
    ///
    /// Segments whose prefix is cached are skipped. An uncached segment is
    /// matched against the existing children of its parent (case-insensitive
    /// title, known document pages excluded) before a new page is created.
    pub async fn ensure_folder_chain(
        &self,
        cache: &mut RemoteNodeCache,
        path: &str,
    ) -> FolderResolution {
        let mut parent_id = self.root_id.to_string();

        for prefix in folder_prefixes(path) {
            if let Some(id) = cache.get(&prefix) {
                parent_id = id.clone();
                continue;
            }

            let title = prefix.rsplit('/').next().unwrap_or(&prefix);
            match self.find_or_create(&parent_id, title).await {
                Ok(id) => {
                    log::debug!("Folder '{}' → {}", prefix, id);
                    cache.insert(prefix.clone(), id.clone());
                    parent_id = id;
                }
                Err(e) => {
                    log::warn!(
                        "Could not resolve folder '{}': {}; falling back to the root",
                        prefix,
                        e
                    );
                    return self.root_fallback();
                }
            }
        }

        FolderResolution {
            node_id: parent_id,
            fell_back: false,
        }
    }

    async fn find_or_create(&self, parent_id: &str, title: &str) -> vaultmirror_core::Result<NodeId> {
        let client = self.client;

        let children = retry_with_backoff(self.retry, || {
            Box::pin(async move { list_all_children(client, parent_id).await })
        })
        .await?;

        if let Some(existing) = children
            .into_iter()
            .find(|c| {
                c.is_container
                    && !self.document_ids.contains(&c.id)
                    && c.title.to_lowercase() == title.to_lowercase()
            })
        {
            log::debug!("Reusing existing remote folder '{}'", title);
            return Ok(existing.id);
        }

        let properties = SyncMetadata::new();
        let properties = &properties;
        retry_with_backoff(self.retry, || {
            Box::pin(async move { client.create_node(parent_id, title, properties, &[]).await })
        })
        .await
    }
}
