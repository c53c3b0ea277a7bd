//! File system watcher for vault changes.
//!
//! Emits [`VaultEvent`]s for mirrored documents and groups bursts of events
//! (an editor saving several times in a row) into one batch with
//! [`next_batch`].

use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use vaultmirror_core::{Error, Result};

use crate::source::{has_allowed_extension, is_excluded};

/// File system event types relevant to mirroring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    /// A file was created
    FileCreated(PathBuf),
    /// A file was modified
    FileModified(PathBuf),
    /// A file was deleted
    FileDeleted(PathBuf),
}

impl VaultEvent {
    /// Path affected by this event
    pub fn path(&self) -> &Path {
        match self {
            Self::FileCreated(p) | Self::FileModified(p) | Self::FileDeleted(p) => p,
        }
    }
}

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Extensions (with leading dot) that produce events
    pub allowed_extensions: Vec<String>,
    /// Vault-relative prefixes that never produce events
    pub excluded_paths: Vec<String>,
    /// Quiet period that ends a burst of events
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".md".to_string()],
            excluded_paths: vec![".obsidian".to_string(), ".trash".to_string()],
            debounce_ms: 1500,
        }
    }
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Watches a vault directory for file system changes
pub struct VaultWatcher {
    config: WatcherConfig,
    watch_path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    event_tx: UnboundedSender<VaultEvent>,
}

impl VaultWatcher {
    /// Create a watcher and the receiver its events are delivered to
    pub fn new(path: PathBuf, config: WatcherConfig) -> (Self, UnboundedReceiver<VaultEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            config,
            watch_path: path,
            watcher: None,
            event_tx,
        };
        (watcher, event_rx)
    }

    /// Start watching the vault directory recursively
    pub fn start(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Err(Error::invalid_path("Watcher already started"));
        }

        let event_tx = self.event_tx.clone();
        let config = self.config.clone();
        let root = self.watch_path.clone();

        let mut notify_watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for vault_event in convert_event(event) {
                        if should_emit_event(&vault_event, &root, &config) {
                            // Receiver may already be gone during shutdown
                            let _ = event_tx.send(vault_event);
                        }
                    }
                }
                Err(e) => log::warn!("File watcher error: {}", e),
            },
            Config::default(),
        )
        .map_err(|e| Error::io(std::io::Error::other(e)))?;

        notify_watcher
            .watch(&self.watch_path, RecursiveMode::Recursive)
            .map_err(|e| Error::io(std::io::Error::other(e)))?;

        log::info!("Watching {}", self.watch_path.display());
        self.watcher = Some(notify_watcher);
        Ok(())
    }

    /// Stop watching; dropping the notify watcher unregisters it
    pub fn stop(&mut self) {
        self.watcher.take();
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }
}

fn convert_event(event: Event) -> Vec<VaultEvent> {
    let make: fn(PathBuf) -> VaultEvent = match event.kind {
        EventKind::Create(_) => VaultEvent::FileCreated,
        EventKind::Modify(_) | EventKind::Any => VaultEvent::FileModified,
        EventKind::Remove(_) => VaultEvent::FileDeleted,
        _ => return Vec::new(),
    };
    event.paths.into_iter().map(make).collect()
}

fn should_emit_event(event: &VaultEvent, root: &Path, config: &WatcherConfig) -> bool {
    let path = event.path();
    if !has_allowed_extension(path, &config.allowed_extensions) {
        return false;
    }

    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    // Hidden files and anything inside a hidden folder
    if relative.iter().any(|segment| segment.starts_with('.')) {
        return false;
    }

    !is_excluded(&relative.join("/"), &config.excluded_paths)
}

/// Wait for the next burst of events.
///
/// Blocks until one event arrives, then keeps collecting until no event has
/// arrived for `quiet`. Returns `None` once the channel is closed and drained.
pub async fn next_batch(
    rx: &mut UnboundedReceiver<VaultEvent>,
    quiet: Duration,
) -> Option<Vec<VaultEvent>> {
    let first = rx.recv().await?;
    let mut batch = vec![first];

    loop {
        match tokio::time::timeout(quiet, rx.recv()).await {
            Ok(Some(event)) => batch.push(event),
            Ok(None) | Err(_) => break,
        }
    }

    batch.dedup();
    Some(batch)
}
