//! Summary of persisted mirror state

use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use vaultmirror_core::{MirrorConfig, MirrorState, Result};

use crate::app::{load_state, open_store};

/// What the state store knows about a vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub vault: PathBuf,
    pub state_file: PathBuf,
    pub root_page_id: String,
    pub tracked_documents: usize,
    pub cached_nodes: usize,
    pub last_pass_at: Option<DateTime<Utc>>,
}

impl StatusSummary {
    pub fn from_state(vault: PathBuf, state_file: PathBuf, state: &MirrorState) -> Self {
        Self {
            vault,
            state_file,
            root_page_id: state.root_page_id.clone(),
            tracked_documents: state.fingerprints.len(),
            cached_nodes: state.nodes.len(),
            last_pass_at: state
                .last_pass_at
                .and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "vault": self.vault.display().to_string(),
            "state_file": self.state_file.display().to_string(),
            "root_page_id": self.root_page_id,
            "tracked_documents": self.tracked_documents,
            "cached_nodes": self.cached_nodes,
            "last_pass_at": self.last_pass_at.map(|t| t.to_rfc3339()),
        })
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vault:              {}", self.vault.display())?;
        writeln!(f, "State file:         {}", self.state_file.display())?;
        if !self.root_page_id.is_empty() {
            writeln!(f, "Root page:          {}", self.root_page_id)?;
        }
        writeln!(f, "Tracked documents:  {}", self.tracked_documents)?;
        writeln!(f, "Cached nodes:       {}", self.cached_nodes)?;
        match self.last_pass_at {
            Some(at) => write!(f, "Last pass:          {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "Last pass:          never"),
        }
    }
}

/// Read the status of the configured vault without touching the remote
pub async fn read_status(config: &MirrorConfig) -> Result<StatusSummary> {
    let store = open_store(config).await?;
    let state = load_state(&store).await;
    Ok(StatusSummary::from_state(
        config.vault_path.clone(),
        store.state_file().to_path_buf(),
        &state,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vaultmirror_core::{Fingerprint, StateStore, SyncMetadata, SyncRecord};

    #[test]
    fn test_summary_counts_state() {
        let mut fingerprints = BTreeMap::new();
        fingerprints.insert(
            "Note.md".to_string(),
            SyncRecord {
                fingerprint: Fingerprint::new("hello", 1_700_000_000_000),
                metadata: SyncMetadata::new(),
            },
        );
        let state = MirrorState {
            root_page_id: "root".to_string(),
            fingerprints,
            nodes: [("Note.md".to_string(), "page-1".to_string())].into(),
            last_pass_at: Some(1_700_000_000_000),
            ..MirrorState::default()
        };

        let summary = StatusSummary::from_state("/v".into(), "/s.json".into(), &state);
        assert_eq!(summary.tracked_documents, 1);
        assert_eq!(summary.cached_nodes, 1);
        assert_eq!(
            summary.to_string().lines().last(),
            Some("Last pass:          2023-11-14 22:13:20 UTC")
        );
        assert_eq!(summary.to_json()["cached_nodes"], 1);
    }

    #[tokio::test]
    async fn test_status_of_fresh_vault() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = MirrorConfig::default();
        config.vault_path = temp.path().to_path_buf();
        config.state_dir = Some(temp.path().join("state"));

        let summary = read_status(&config).await.unwrap();
        assert_eq!(summary.tracked_documents, 0);
        assert_eq!(summary.last_pass_at, None);
        assert!(summary.to_string().ends_with("never"));

        // The store location is stable across opens
        let store = StateStore::init_in(&temp.path().join("state"), temp.path())
            .await
            .unwrap();
        assert_eq!(store.state_file(), summary.state_file.as_path());
    }
}
