//! # VaultMirror Remote
//!
//! Write side of the mirror: the [`RemoteClient`] capability and its
//! implementation over the Notion HTTPS API.
//!
//! Every failure is an [`vaultmirror_core::Error::Remote`] carrying a
//! [`vaultmirror_core::RemoteErrorKind`]; the sync engine decides from the
//! kind whether a call is retried, isolated to one document, or fatal.
//!
//! ```no_run
//! use vaultmirror_remote::{NotionClient, RemoteClient};
//! use vaultmirror_core::MirrorConfig;
//!
//! # async fn example(config: MirrorConfig) -> vaultmirror_core::Result<()> {
//! let client = NotionClient::new(&config)?;
//! if !client.get_node(&config.root_page_id).await? {
//!     eprintln!("root page is not shared with the integration");
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocks;
pub mod client;
pub mod notion;

pub use client::{RemoteClient, list_all_children, page_url};
pub use notion::NotionClient;
