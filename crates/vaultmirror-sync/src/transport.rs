//! Retried, batched writes to the remote.
//!
//! Every block write goes through [`send_with_shrinking_batch`]: a failing
//! batch is retried with half as many blocks, and the smaller size is kept
//! for the rest of the document. A short pause follows each successful
//! write and separates consecutive deletes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vaultmirror_core::resilience::{RetryFuture, retry_with_backoff, send_with_shrinking_batch};
use vaultmirror_core::{
    Batch, ContentBlock, Error, NodeId, Result, RetryConfig, SendOutcome, SyncMetadata,
};
use vaultmirror_remote::{RemoteClient, list_all_children};

/// Writes blocks and pages through a [`RemoteClient`] with retry policy.
///
/// One writer serves one document: a batch size shrunk by a retry stays in
/// effect for every later write through the same writer.
pub struct BlockWriter<'a> {
    client: &'a dyn RemoteClient,
    retry: &'a RetryConfig,
    batch_size: AtomicUsize,
    delay: Duration,
}

impl<'a> BlockWriter<'a> {
    pub fn new(
        client: &'a dyn RemoteClient,
        retry: &'a RetryConfig,
        batch_size: usize,
        delay: Duration,
    ) -> Self {
        Self {
            client,
            retry,
            batch_size: AtomicUsize::new(batch_size.max(1)),
            delay,
        }
    }

    /// Current batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Relaxed)
    }

    fn settle(&self, sent: usize, attempts: u32) {
        if attempts > 1 && sent < self.batch_size.load(Ordering::Relaxed) {
            log::debug!("Batch size reduced to {}", sent);
            self.batch_size.store(sent.max(1), Ordering::Relaxed);
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Run a single remote call with backoff
    pub async fn call<'f, T, F>(&self, f: F) -> Result<T>
    where
        F: FnMut() -> RetryFuture<'f, T>,
    {
        retry_with_backoff(self.retry, f).await
    }

    /// Create a page carrying the first batch of `blocks`.
    ///
    /// Returns the new node id and how many blocks went into the page.
    pub async fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        properties: &SyncMetadata,
        blocks: &[ContentBlock],
    ) -> Result<(NodeId, usize)> {
        let client = self.client;
        let batch = Batch::new(blocks, self.batch_size.load(Ordering::Relaxed));

        let outcome = send_with_shrinking_batch(self.retry, batch, |chunk: Vec<ContentBlock>| {
            Box::pin(async move { client.create_node(parent_id, title, properties, &chunk).await })
        })
        .await;

        match outcome {
            SendOutcome::Sent {
                value,
                sent,
                attempts,
            } => {
                self.settle(sent, attempts);
                self.pause().await;
                Ok((value, sent))
            }
            SendOutcome::Exhausted { error, attempts } => {
                log::debug!("Creating '{}' failed after {} attempts", title, attempts);
                Err(error)
            }
        }
    }

    /// Append `blocks` in batches, in order
    pub async fn append_all(&self, node_id: &str, blocks: &[ContentBlock]) -> Result<()> {
        let client = self.client;
        let mut offset = 0;

        while offset < blocks.len() {
            let batch = Batch::new(&blocks[offset..], self.batch_size.load(Ordering::Relaxed));
            let outcome = send_with_shrinking_batch(self.retry, batch, |chunk: Vec<ContentBlock>| {
                Box::pin(async move { client.append_blocks(node_id, &chunk).await })
            })
            .await;

            match outcome {
                SendOutcome::Sent { sent, attempts, .. } => {
                    self.settle(sent, attempts);
                    offset += sent;
                    self.pause().await;
                }
                SendOutcome::Exhausted { error, attempts } => {
                    log::debug!(
                        "Appending blocks {}..{} to {} failed after {} attempts",
                        offset,
                        blocks.len(),
                        node_id,
                        attempts
                    );
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    /// Archive the content blocks of a page, leaving sub-pages in place
    pub async fn clear_content(&self, node_id: &str) -> Result<usize> {
        let client = self.client;
        let children = self
            .call(|| Box::pin(async move { list_all_children(client, node_id).await }))
            .await?;

        let mut archived = 0;
        for child in children.iter().filter(|c| !c.is_container) {
            let id = child.id.as_str();
            self.call(|| Box::pin(async move { client.archive_node(id).await }))
                .await?;
            archived += 1;
            self.pause().await;
        }
        Ok(archived)
    }

    /// Clear a page's content and append new blocks
    pub async fn replace_content(&self, node_id: &str, blocks: &[ContentBlock]) -> Result<()> {
        let cleared = self.clear_content(node_id).await?;
        log::debug!("Cleared {} blocks from {}", cleared, node_id);
        self.append_all(node_id, blocks).await
    }

    /// Archive nodes one at a time, pausing between deletes.
    ///
    /// Progress is logged per group of `group_size`. Failures are collected
    /// instead of stopping the remaining archives.
    pub async fn archive_all(&self, ids: &[NodeId], group_size: usize) -> Vec<(NodeId, Error)> {
        let client = self.client;
        let mut failures = Vec::new();

        for (index, group) in ids.chunks(group_size.max(1)).enumerate() {
            for (offset, id) in group.iter().enumerate() {
                if index > 0 || offset > 0 {
                    self.pause().await;
                }
                let node = id.as_str();
                if let Err(e) = self
                    .call(|| Box::pin(async move { client.archive_node(node).await }))
                    .await
                {
                    failures.push((id.clone(), e));
                }
            }
            log::debug!(
                "Archived {}/{} nodes",
                (index * group_size.max(1) + group.len()).min(ids.len()),
                ids.len()
            );
        }

        failures
    }
}
