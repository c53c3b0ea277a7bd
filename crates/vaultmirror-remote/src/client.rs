//! The remote workspace capability.

use async_trait::async_trait;
use vaultmirror_core::{ChildPage, ChildSummary, ContentBlock, NodeId, Result, SyncMetadata};

/// Operations the mirror needs from a hierarchical remote workspace.
///
/// Implementations enforce their own per-request timeouts; callers apply
/// retry and batching policy on top.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Whether the node exists and is reachable with the current credential.
    ///
    /// A missing node is `Ok(false)`; authentication and transport failures
    /// are errors.
    async fn get_node(&self, id: &str) -> Result<bool>;

    /// Create a page under `parent_id` with an initial set of blocks
    async fn create_node(
        &self,
        parent_id: &str,
        title: &str,
        properties: &SyncMetadata,
        blocks: &[ContentBlock],
    ) -> Result<NodeId>;

    /// Replace the title and properties of an existing page
    async fn update_properties(
        &self,
        id: &str,
        title: &str,
        properties: &SyncMetadata,
    ) -> Result<()>;

    /// Append blocks after the existing children of a node
    async fn append_blocks(&self, id: &str, blocks: &[ContentBlock]) -> Result<()>;

    /// One page of the children of a node
    async fn list_children(&self, id: &str, cursor: Option<&str>) -> Result<ChildPage>;

    /// Archive (soft-delete) a node
    async fn archive_node(&self, id: &str) -> Result<()>;
}

/// Follow pagination cursors until every child of `id` is listed
pub async fn list_all_children(client: &dyn RemoteClient, id: &str) -> Result<Vec<ChildSummary>> {
    let mut children = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = client.list_children(id, cursor.as_deref()).await?;
        children.extend(page.children);
        match page.next_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            Some(_) => {
                log::warn!("Remote returned the same cursor twice while listing {}", id);
                break;
            }
            None => break,
        }
    }

    Ok(children)
}

/// Browser URL of a remote page, used as a link target
pub fn page_url(id: &str) -> String {
    format!("https://www.notion.so/{}", id.replace('-', ""))
}
