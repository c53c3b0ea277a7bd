//! Persistent state for incremental passes
//!
//! Fingerprints and the remote node cache seed survive process restarts so
//! that the next incremental pass can skip unchanged documents and reuse
//! remote pages instead of recreating them.
//!
//! State structure:
//! ~/.cache/vaultmirror/vaults/{vault_hash}/state.json
//!
//! Cache location:
//! - Linux/macOS: ~/.cache/vaultmirror/ or $XDG_CACHE_HOME/vaultmirror/
//! - Windows: %LOCALAPPDATA%\vaultmirror\cache\
//! - Fallback: ~/.vaultmirror/cache/ (all platforms)

use crate::error::{Error, Result};
use crate::models::{Fingerprint, NodeId, SyncMetadata};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Current on-disk format version
pub const STATE_VERSION: u32 = 1;

/// Fingerprint plus the frontmatter that was sent with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub fingerprint: Fingerprint,
    #[serde(default)]
    pub metadata: SyncMetadata,
}

/// Everything persisted between passes for one vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorState {
    /// Format version for future compatibility
    pub version: u32,
    /// Vault path the state belongs to (for reference)
    #[serde(default)]
    pub vault: String,
    /// Remote root page the nodes live under
    #[serde(default)]
    pub root_page_id: String,
    /// Document path → last synced fingerprint
    #[serde(default)]
    pub fingerprints: BTreeMap<String, SyncRecord>,
    /// Folder or document path → remote node id
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeId>,
    /// Unix millis of the last non-fatal pass
    #[serde(default)]
    pub last_pass_at: Option<i64>,
}

impl Default for MirrorState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            vault: String::new(),
            root_page_id: String::new(),
            fingerprints: BTreeMap::new(),
            nodes: BTreeMap::new(),
            last_pass_at: None,
        }
    }
}

/// JSON file backed store for [`MirrorState`]
pub struct StateStore {
    state_file: PathBuf,
    vault_id: String,
}

impl StateStore {
    /// Store in the platform cache directory, keyed by the vault path
    pub async fn init(vault_path: &Path) -> Result<Self> {
        let cache_dir = Self::get_cache_dir()?;
        Self::init_in(&cache_dir, vault_path).await
    }

    /// Store under an explicit base directory (config override, tests)
    pub async fn init_in(base_dir: &Path, vault_path: &Path) -> Result<Self> {
        let canonical = vault_path
            .canonicalize()
            .unwrap_or_else(|_| vault_path.to_path_buf());
        let vault_id = Self::hash_path(&canonical);
        let vault_dir = base_dir.join("vaults").join(&vault_id);

        if !vault_dir.exists() {
            fs::create_dir_all(&vault_dir).await.map_err(Error::io)?;
        }

        log::debug!(
            "State store for {} at {}",
            canonical.display(),
            vault_dir.display()
        );

        Ok(Self {
            state_file: vault_dir.join("state.json"),
            vault_id,
        })
    }

    /// Hash a path to create a safe directory name
    fn hash_path(path: &Path) -> String {
        let path_str = path.to_string_lossy();
        let mut hasher = Sha256::new();
        hasher.update(path_str.as_bytes());
        let result = hasher.finalize();
        format!("{:x}", result)[..16].to_string()
    }

    /// Get the platform-specific cache directory
    fn get_cache_dir() -> Result<PathBuf> {
        if let Ok(cache_home) = std::env::var("XDG_CACHE_HOME") {
            return Ok(PathBuf::from(cache_home).join("vaultmirror"));
        }

        #[cfg(target_os = "windows")]
        {
            if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
                return Ok(PathBuf::from(local_app_data)
                    .join("vaultmirror")
                    .join("cache"));
            }
        }

        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".cache").join("vaultmirror"));
            }
        }

        if let Ok(home) = std::env::var("HOME") {
            return Ok(PathBuf::from(home).join(".vaultmirror").join("cache"));
        }

        Err(Error::config_error(
            "Cannot determine cache directory: HOME not set and no platform-specific override found",
        ))
    }

    /// Load state; a missing file yields empty state
    pub async fn load(&self) -> Result<MirrorState> {
        if !self.state_file.exists() {
            return Ok(MirrorState::default());
        }

        let content = fs::read_to_string(&self.state_file)
            .await
            .map_err(Error::io)?;

        let state: MirrorState = serde_json::from_str(&content)
            .map_err(|e| Error::state_error(format!("Invalid state file format: {}", e)))?;

        if state.version > STATE_VERSION {
            return Err(Error::state_error(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        log::debug!(
            "Loaded state {}: {} fingerprints, {} nodes",
            self.vault_id,
            state.fingerprints.len(),
            state.nodes.len()
        );

        Ok(state)
    }

    /// Save state atomically (temp file + rename)
    pub async fn save(&self, state: &MirrorState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state_error(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.state_file.with_extension("json.tmp");
        fs::write(&temp_path, json).await.map_err(Error::io)?;
        fs::rename(&temp_path, &self.state_file)
            .await
            .map_err(Error::io)?;

        log::debug!(
            "Saved state {}: {} fingerprints, {} nodes",
            self.vault_id,
            state.fingerprints.len(),
            state.nodes.len()
        );

        Ok(())
    }

    /// Remove persisted state
    pub async fn clear(&self) -> Result<()> {
        if self.state_file.exists() {
            fs::remove_file(&self.state_file).await.map_err(Error::io)?;
        }
        log::info!("State cleared for vault {}", self.vault_id);
        Ok(())
    }

    /// Path of the state file for diagnostics
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Vault identifier for diagnostics
    pub fn vault_id(&self) -> &str {
        &self.vault_id
    }
}
