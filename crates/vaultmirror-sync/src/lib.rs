//! # VaultMirror Sync
//!
//! The incremental mirror synchronization engine: decides which documents
//! changed, makes sure their folders exist remotely, converts them to
//! content blocks and writes them with retry and batch shrinking.
//!
//! ## Components
//!
//! - [`tracker::ChangeTracker`] - content fingerprints, mtime pre-filter
//! - [`resolver::RemoteNodeCache`] / [`resolver::NodeResolver`] - path to
//!   remote node mapping, folder creation, wikilink targets
//! - [`transport::BlockWriter`] - retried, batched remote writes
//! - [`orchestrator::SyncEngine`] - one pass from connection to report
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vaultmirror_core::MirrorConfig;
//! use vaultmirror_remote::NotionClient;
//! use vaultmirror_sync::{EngineSettings, SyncEngine};
//! use vaultmirror_vault::FsVault;
//!
//! # async fn example(config: MirrorConfig) -> vaultmirror_core::Result<()> {
//! let vault = Arc::new(FsVault::new(&config.vault_path, config.allowed_extensions.clone())?);
//! let remote = Arc::new(NotionClient::new(&config)?);
//! let mut engine = SyncEngine::new(vault, remote, EngineSettings::from(&config));
//!
//! let report = engine.run_incremental_sync().await;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod orchestrator;
pub mod resolver;
pub mod tracker;
pub mod transport;

pub use orchestrator::{EngineSettings, SyncEngine};
pub use resolver::{FolderResolution, NodeResolver, RemoteNodeCache};
pub use tracker::{ChangeTracker, Detection};
pub use transport::BlockWriter;
