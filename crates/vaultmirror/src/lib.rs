//! # VaultMirror
//!
//! Application layer of the mirror: loads configuration, restores persisted
//! state, runs incremental or full passes and watches the vault for changes.
//! The `vaultmirror` binary is a thin command-line shell over [`MirrorApp`].
//!
//! ```no_run
//! use vaultmirror::{MirrorApp, Overrides, exit_code, load_config};
//! use vaultmirror_core::SyncMode;
//!
//! # async fn example() -> vaultmirror_core::Result<()> {
//! let config = load_config(None, &Overrides::default())?;
//! let app = MirrorApp::new(config).await?;
//! let report = app.run(SyncMode::Incremental).await;
//! std::process::exit(exit_code(&report).into());
//! # }
//! ```

pub mod app;
pub mod status;

pub use app::{MirrorApp, Overrides, exit_code, load_config, load_state, open_store};
pub use status::{StatusSummary, read_status};
pub use vaultmirror_core::prelude::*;
