//! # VaultMirror Vault
//!
//! Read side of the mirror: enumerating and reading the documents of a vault,
//! and watching it for changes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vaultmirror_vault::{FsVault, VaultSource};
//!
//! # async fn example() -> vaultmirror_core::Result<()> {
//! let vault = FsVault::new("/path/to/vault", vec![".md".to_string()])?;
//! let excluded = vec![".obsidian".to_string()];
//!
//! for doc in vault.enumerate_documents(&excluded).await? {
//!     let text = vault.read_content(&doc).await?;
//!     println!("{}: {} bytes", doc.path, text.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`source`] - the [`VaultSource`] capability and the filesystem vault
//! - [`watcher`] - debounced change notifications for watch mode

pub mod source;
pub mod watcher;

pub use source::{FsVault, VaultSource, has_allowed_extension, is_excluded};
pub use watcher::{VaultEvent, VaultWatcher, WatcherConfig, next_batch};
