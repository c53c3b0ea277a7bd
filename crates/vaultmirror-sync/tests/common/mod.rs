//! Shared fakes for sync engine integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use vaultmirror_core::{
    ChildPage, ChildSummary, ContentBlock, DocumentRef, Error, NodeId, RemoteErrorKind, Result,
    RetryConfig, SyncMetadata, SyncSettings,
};
use vaultmirror_remote::RemoteClient;
use vaultmirror_sync::{EngineSettings, SyncEngine};
use vaultmirror_vault::{VaultSource, is_excluded};

pub const ROOT: &str = "root";

// ============================================================================
// In-memory vault
// ============================================================================

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    modified_at_millis: Option<i64>,
}

/// Vault whose documents live in memory
#[derive(Default)]
pub struct MemoryVault {
    files: Mutex<BTreeMap<String, MemoryFile>>,
    unreadable: Mutex<Vec<String>>,
    resave_after_read: Mutex<HashMap<String, String>>,
    reads: Mutex<usize>,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl MemoryVault {
    pub fn with(files: &[(&str, &str)]) -> Arc<Self> {
        let vault = Self::default();
        for (path, content) in files {
            vault.write(path, content, Some(1));
        }
        Arc::new(vault)
    }

    pub fn write(&self, path: &str, content: &str, modified_at_millis: Option<i64>) {
        self.files.lock().unwrap().insert(
            path.to_string(),
            MemoryFile {
                content: content.to_string(),
                modified_at_millis,
            },
        );
    }

    /// Change content and bump mtime far into the future
    pub fn edit(&self, path: &str, content: &str) {
        self.write(path, content, Some(i64::MAX / 2));
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    /// Save `content` with a current mtime right after the next read of `path`
    pub fn resave_after_read(&self, path: &str, content: &str) {
        self.resave_after_read
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    pub fn make_unreadable(&self, path: &str) {
        self.unreadable.lock().unwrap().push(path.to_string());
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

#[async_trait]
impl VaultSource for MemoryVault {
    async fn enumerate_documents(&self, excluded_prefixes: &[String]) -> Result<Vec<DocumentRef>> {
        let files = self.files.lock().unwrap();
        Ok(files
            .iter()
            .filter(|(path, _)| !is_excluded(path, excluded_prefixes))
            .map(|(path, file)| {
                DocumentRef::from_path(path.clone(), file.modified_at_millis, file.content.len() as u64)
            })
            .collect())
    }

    async fn read_content(&self, doc: &DocumentRef) -> Result<String> {
        *self.reads.lock().unwrap() += 1;
        if self.unreadable.lock().unwrap().contains(&doc.path) {
            return Err(Error::io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }
        let content = self
            .files
            .lock()
            .unwrap()
            .get(&doc.path)
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::file_not_found(&doc.path))?;

        let resave = self.resave_after_read.lock().unwrap().remove(&doc.path);
        if let Some(newer) = resave {
            self.write(&doc.path, &newer, Some(now_millis()));
        }
        Ok(content)
    }
}

// ============================================================================
// Recording remote
// ============================================================================

/// One call made against the mock remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetNode(String),
    CreateNode {
        parent: String,
        title: String,
        blocks: usize,
    },
    UpdateProperties(String),
    AppendBlocks {
        id: String,
        blocks: usize,
    },
    ListChildren(String),
    ArchiveNode(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::GetNode(_) | Call::ListChildren(_))
    }
}

/// Operation kinds failures can be scripted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetNode,
    Create,
    Update,
    Append,
    List,
    Archive,
}

#[derive(Debug, Clone)]
enum Content {
    Page {
        title: String,
        properties: SyncMetadata,
    },
    Block(ContentBlock),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<String>,
    content: Content,
    archived: bool,
}

#[derive(Default)]
struct RemoteState {
    nodes: HashMap<String, Node>,
    children: HashMap<String, Vec<String>>,
    next_id: usize,
    calls: Vec<Call>,
    scripted: HashMap<Op, Vec<RemoteErrorKind>>,
    failing_titles: Vec<String>,
}

impl RemoteState {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn add_node(&mut self, parent: &str, content: Content) -> String {
        let prefix = match content {
            Content::Page { .. } => "page",
            Content::Block(_) => "block",
        };
        let id = self.new_id(prefix);
        self.nodes.insert(
            id.clone(),
            Node {
                parent: Some(parent.to_string()),
                content,
                archived: false,
            },
        );
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(id.clone());
        id
    }

    fn scripted_failure(&mut self, op: Op) -> Result<()> {
        if let Some(queue) = self.scripted.get_mut(&op)
            && !queue.is_empty()
        {
            let kind = queue.remove(0);
            return Err(Error::remote(kind, None, format!("scripted {:?} failure", op)));
        }
        Ok(())
    }

    fn live(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id).filter(|n| !n.archived)
    }

    fn exists(&self, id: &str) -> bool {
        id == ROOT || self.live(id).is_some()
    }

    fn live_children(&self, id: &str) -> Vec<String> {
        self.children
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter(|c| self.live(c).is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Remote that keeps an in-memory page tree and records every call
pub struct MockRemote {
    state: Mutex<RemoteState>,
    page_size: usize,
    root_exists: bool,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self {
            state: Mutex::new(RemoteState::default()),
            page_size: 3,
            root_exists: true,
        }
    }
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn without_root() -> Arc<Self> {
        Arc::new(Self {
            root_exists: false,
            ..Self::default()
        })
    }

    /// Pre-populate a page under `parent`
    pub fn seed_page(&self, parent: &str, title: &str) -> String {
        self.state.lock().unwrap().add_node(
            parent,
            Content::Page {
                title: title.to_string(),
                properties: SyncMetadata::new(),
            },
        )
    }

    /// Make the next calls of `op` fail with the given kinds, in order
    pub fn fail_next(&self, op: Op, kinds: &[RemoteErrorKind]) {
        self.state
            .lock()
            .unwrap()
            .scripted
            .entry(op)
            .or_default()
            .extend_from_slice(kinds);
    }

    /// Reject every create for a page with this title
    pub fn reject_title(&self, title: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_titles
            .push(title.to_string());
    }

    /// Archive a node behind the engine's back
    pub fn delete_remotely(&self, id: &str) {
        if let Some(node) = self.state.lock().unwrap().nodes.get_mut(id) {
            node.archived = true;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn created_titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateNode { title, .. } => Some(title),
                _ => None,
            })
            .collect()
    }

    /// Titles of the live pages directly under `parent`
    pub fn page_titles(&self, parent: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .live_children(parent)
            .iter()
            .filter_map(|id| match &state.nodes[id].content {
                Content::Page { title, .. } => Some(title.clone()),
                Content::Block(_) => None,
            })
            .collect()
    }

    /// Live content blocks of a page, in order
    pub fn blocks(&self, page: &str) -> Vec<ContentBlock> {
        let state = self.state.lock().unwrap();
        state
            .live_children(page)
            .iter()
            .filter_map(|id| match &state.nodes[id].content {
                Content::Block(block) => Some(block.clone()),
                Content::Page { .. } => None,
            })
            .collect()
    }

    pub fn properties(&self, page: &str) -> Option<SyncMetadata> {
        let state = self.state.lock().unwrap();
        match &state.live(page)?.content {
            Content::Page { properties, .. } => Some(properties.clone()),
            Content::Block(_) => None,
        }
    }

    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.state.lock().unwrap().nodes.get(id)?.parent.clone()
    }
}

fn not_found(id: &str) -> Error {
    Error::remote(RemoteErrorKind::NotFound, Some(404), format!("{} not found", id))
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn get_node(&self, id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetNode(id.to_string()));
        state.scripted_failure(Op::GetNode)?;
        if id == ROOT {
            return Ok(self.root_exists);
        }
        Ok(state.exists(id))
    }

    async fn create_node(
        &self,
        parent_id: &str,
        title: &str,
        properties: &SyncMetadata,
        blocks: &[ContentBlock],
    ) -> Result<NodeId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateNode {
            parent: parent_id.to_string(),
            title: title.to_string(),
            blocks: blocks.len(),
        });
        state.scripted_failure(Op::Create)?;
        if state.failing_titles.iter().any(|t| t == title) {
            return Err(Error::remote(
                RemoteErrorKind::Rejected,
                Some(400),
                format!("validation_error: cannot create '{}'", title),
            ));
        }
        if !state.exists(parent_id) {
            return Err(not_found(parent_id));
        }

        let id = state.add_node(
            parent_id,
            Content::Page {
                title: title.to_string(),
                properties: properties.clone(),
            },
        );
        for block in blocks {
            state.add_node(&id, Content::Block(block.clone()));
        }
        Ok(id)
    }

    async fn update_properties(&self, id: &str, title: &str, properties: &SyncMetadata) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateProperties(id.to_string()));
        state.scripted_failure(Op::Update)?;
        match state.nodes.get_mut(id).filter(|n| !n.archived) {
            Some(node) => {
                node.content = Content::Page {
                    title: title.to_string(),
                    properties: properties.clone(),
                };
                Ok(())
            }
            None => Err(not_found(id)),
        }
    }

    async fn append_blocks(&self, id: &str, blocks: &[ContentBlock]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AppendBlocks {
            id: id.to_string(),
            blocks: blocks.len(),
        });
        state.scripted_failure(Op::Append)?;
        if !state.exists(id) {
            return Err(not_found(id));
        }
        for block in blocks {
            state.add_node(id, Content::Block(block.clone()));
        }
        Ok(())
    }

    async fn list_children(&self, id: &str, cursor: Option<&str>) -> Result<ChildPage> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListChildren(id.to_string()));
        state.scripted_failure(Op::List)?;
        if !state.exists(id) {
            return Err(not_found(id));
        }

        let all = state.live_children(id);
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(all.len());
        let children = all[start..end]
            .iter()
            .map(|child| {
                let node = &state.nodes[child];
                match &node.content {
                    Content::Page { title, .. } => ChildSummary {
                        id: child.clone(),
                        title: title.clone(),
                        is_container: true,
                    },
                    Content::Block(_) => ChildSummary {
                        id: child.clone(),
                        title: String::new(),
                        is_container: false,
                    },
                }
            })
            .collect();

        Ok(ChildPage {
            children,
            next_cursor: (end < all.len()).then(|| end.to_string()),
        })
    }

    async fn archive_node(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ArchiveNode(id.to_string()));
        state.scripted_failure(Op::Archive)?;
        match state.nodes.get_mut(id).filter(|n| !n.archived) {
            Some(node) => {
                node.archived = true;
                Ok(())
            }
            None => Err(not_found(id)),
        }
    }
}

// ============================================================================
// Engine helpers
// ============================================================================

/// Settings with no pauses and immediate retries
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        root_page_id: ROOT.to_string(),
        excluded_paths: vec![".obsidian".to_string()],
        sync: SyncSettings {
            request_delay_ms: 0,
            ..SyncSettings::default()
        },
        retry: RetryConfig::immediate(),
    }
}

pub fn engine(vault: &Arc<MemoryVault>, remote: &Arc<MockRemote>) -> SyncEngine {
    engine_with(vault, remote, fast_settings())
}

pub fn engine_with(
    vault: &Arc<MemoryVault>,
    remote: &Arc<MockRemote>,
    settings: EngineSettings,
) -> SyncEngine {
    SyncEngine::new(vault.clone(), remote.clone(), settings)
}
