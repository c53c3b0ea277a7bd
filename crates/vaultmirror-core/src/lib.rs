//! # VaultMirror Core
//!
//! Core data models, error types, and configuration for mirroring an
//! Obsidian vault into a Notion-style remote workspace.
//! This crate defines the canonical types that all other crates depend on.
//!
//! ## Core Modules
//!
//! - [`models`] - Documents, fingerprints, content blocks and pass reports
//! - [`error`] - Error taxonomy and Result alias
//! - [`config`] - Mirror configuration and layered loading
//! - [`resilience`] - Retry with backoff and adaptive batch shrinking
//! - [`state`] - Persisted fingerprints and remote node ids
//!
//! ## Error Handling
//!
//! ```
//! use vaultmirror_core::prelude::*;
//!
//! let err = Error::remote(RemoteErrorKind::RateLimited, Some(429), "slow down");
//! assert!(err.is_retryable());
//! ```
//!
//! ## Content Blocks
//!
//! ```
//! use vaultmirror_core::prelude::*;
//!
//! let block = ContentBlock::heading(1, "Title");
//! assert_eq!(block.text_len(), 5);
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod resilience;
pub mod state;

pub use config::*;
pub use error::{Error, RemoteErrorKind, Result};
pub use models::*;
pub use resilience::{Batch, RetryConfig, SendOutcome};
pub use state::{MirrorState, StateStore, SyncRecord};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{MirrorConfig, Secret, SyncSettings};
    pub use crate::error::{Error, RemoteErrorKind, Result};
    pub use crate::models::{
        Annotations, ChildPage, ChildSummary, ContentBlock, DocumentError, DocumentOutcome,
        DocumentRef, Fingerprint, NodeId, PassStatus, RichText, SyncCounts, SyncMetadata,
        SyncMode, SyncReport, TextSpan,
    };
    pub use crate::resilience::{Batch, RetryConfig, SendOutcome};
    pub use crate::state::{MirrorState, StateStore, SyncRecord};
}
