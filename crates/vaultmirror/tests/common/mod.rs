//! Minimal collaborators for application tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use vaultmirror_core::{
    ChildPage, ContentBlock, DocumentRef, Error, NodeId, RemoteErrorKind, Result, SyncMetadata,
};
use vaultmirror_remote::RemoteClient;
use vaultmirror_vault::VaultSource;

pub const ROOT: &str = "root";

/// Vault documents kept in a map
#[derive(Default)]
pub struct StaticVault {
    files: Mutex<BTreeMap<String, String>>,
}

impl StaticVault {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let vault = Self::default();
        for (path, content) in files {
            vault.put(path, content);
        }
        vault
    }

    pub fn put(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }
}

#[async_trait]
impl VaultSource for StaticVault {
    async fn enumerate_documents(&self, _excluded: &[String]) -> Result<Vec<DocumentRef>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, content)| DocumentRef::from_path(path.clone(), None, content.len() as u64))
            .collect())
    }

    async fn read_content(&self, doc: &DocumentRef) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(&doc.path)
            .cloned()
            .ok_or_else(|| Error::file_not_found(&doc.path))
    }
}

/// Remote that accepts every write and counts page creations
#[derive(Default)]
pub struct CountingRemote {
    offline: AtomicBool,
    next_id: AtomicUsize,
    created: Mutex<Vec<String>>,
}

impl CountingRemote {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteClient for CountingRemote {
    async fn get_node(&self, _id: &str) -> Result<bool> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::remote(
                RemoteErrorKind::Network,
                None,
                "connection refused",
            ));
        }
        Ok(true)
    }

    async fn create_node(
        &self,
        _parent_id: &str,
        title: &str,
        _properties: &SyncMetadata,
        _blocks: &[ContentBlock],
    ) -> Result<NodeId> {
        self.created.lock().unwrap().push(title.to_string());
        Ok(format!("node-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn update_properties(&self, _id: &str, _title: &str, _props: &SyncMetadata) -> Result<()> {
        Ok(())
    }

    async fn append_blocks(&self, _id: &str, _blocks: &[ContentBlock]) -> Result<()> {
        Ok(())
    }

    async fn list_children(&self, _id: &str, _cursor: Option<&str>) -> Result<ChildPage> {
        Ok(ChildPage::default())
    }

    async fn archive_node(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}
