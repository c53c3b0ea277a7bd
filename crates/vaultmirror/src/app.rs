//! Application wiring: configuration, persisted state and the sync engine.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use vaultmirror_core::{
    MirrorConfig, MirrorState, PassStatus, Result, Secret, StateStore, SyncMode, SyncReport,
};
use vaultmirror_remote::{NotionClient, RemoteClient};
use vaultmirror_sync::{EngineSettings, SyncEngine};
use vaultmirror_vault::{FsVault, VaultSource, VaultWatcher, WatcherConfig, next_batch};

/// Command-line values that take precedence over the file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vault: Option<PathBuf>,
    pub root_page: Option<String>,
    pub api_token: Option<String>,
}

impl Overrides {
    pub fn apply(&self, mut config: MirrorConfig) -> MirrorConfig {
        if let Some(vault) = &self.vault {
            config.vault_path = vault.clone();
        }
        if let Some(root) = &self.root_page {
            config.root_page_id = root.clone();
        }
        if let Some(token) = &self.api_token {
            config.api_token = Secret::new(token.clone());
        }
        config.expanded()
    }
}

/// Load the layered configuration and apply command-line overrides.
///
/// The result is not validated; commands that talk to the remote call
/// [`MirrorConfig::validate`] themselves.
pub fn load_config(file: Option<&Path>, overrides: &Overrides) -> Result<MirrorConfig> {
    Ok(overrides.apply(MirrorConfig::load(file)?))
}

/// State store for the configured vault
pub async fn open_store(config: &MirrorConfig) -> Result<StateStore> {
    match &config.state_dir {
        Some(dir) => StateStore::init_in(dir, &config.vault_path).await,
        None => StateStore::init(&config.vault_path).await,
    }
}

/// Load persisted state, starting empty when the file cannot be used
pub async fn load_state(store: &StateStore) -> MirrorState {
    match store.load().await {
        Ok(state) => state,
        Err(e) => {
            log::warn!(
                "Ignoring unreadable state file {}: {}; starting from empty state",
                store.state_file().display(),
                e
            );
            MirrorState::default()
        }
    }
}

/// Process exit code for a finished pass
pub fn exit_code(report: &SyncReport) -> u8 {
    match report.status {
        PassStatus::Success => 0,
        PassStatus::PartialFailure => 1,
        PassStatus::FatalFailure { .. } => 2,
    }
}

/// A configured mirror: one vault, one remote root, one engine.
///
/// Passes are serialized through a mutex around the engine. State is saved
/// after every pass that did not abort.
pub struct MirrorApp {
    config: MirrorConfig,
    store: StateStore,
    engine: Arc<Mutex<SyncEngine>>,
}

impl MirrorApp {
    /// Mirror backed by the filesystem vault and the HTTPS client
    pub async fn new(config: MirrorConfig) -> Result<Self> {
        config.validate()?;
        let vault = Arc::new(FsVault::new(
            &config.vault_path,
            config.allowed_extensions.clone(),
        )?);
        let remote = Arc::new(NotionClient::new(&config)?);
        Self::with_parts(config, vault, remote).await
    }

    /// Mirror over explicit collaborators
    pub async fn with_parts(
        config: MirrorConfig,
        vault: Arc<dyn VaultSource>,
        remote: Arc<dyn RemoteClient>,
    ) -> Result<Self> {
        let store = open_store(&config).await?;
        let state = load_state(&store).await;
        log::info!(
            "Loaded state: {} tracked documents, {} cached nodes",
            state.fingerprints.len(),
            state.nodes.len()
        );

        let engine = SyncEngine::new(vault, remote, EngineSettings::from(&config)).with_state(state);
        Ok(Self {
            config,
            store,
            engine: Arc::new(Mutex::new(engine)),
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run a pass unless another one is in flight
    pub async fn try_run(&self, mode: SyncMode) -> Option<SyncReport> {
        let mut engine = self.engine.try_lock().ok()?;
        Some(self.run_locked(&mut engine, mode).await)
    }

    /// Run a pass, waiting for a pass in flight to finish first
    pub async fn run(&self, mode: SyncMode) -> SyncReport {
        let mut engine = self.engine.lock().await;
        self.run_locked(&mut engine, mode).await
    }

    async fn run_locked(&self, engine: &mut SyncEngine, mode: SyncMode) -> SyncReport {
        let report = match mode {
            SyncMode::Incremental => engine.run_incremental_sync().await,
            SyncMode::FullResync => engine.run_full_resync().await,
        };

        if !report.is_fatal() {
            let mut state = engine.state();
            state.vault = self.config.vault_path.display().to_string();
            if let Err(e) = self.store.save(&state).await {
                log::error!("Failed to save state: {}", e);
            }
        }
        report
    }

    /// Sync once, then again after every burst of vault changes until
    /// `shutdown` completes.
    pub async fn watch<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let watcher_config = WatcherConfig {
            allowed_extensions: self.config.allowed_extensions.clone(),
            excluded_paths: self.config.excluded_paths.clone(),
            ..WatcherConfig::default()
        };
        let quiet = watcher_config.debounce();
        let (mut watcher, mut events) =
            VaultWatcher::new(self.config.vault_path.clone(), watcher_config);
        watcher.start()?;
        log::info!("Watching {}", self.config.vault_path.display());

        let report = self.run(SyncMode::Incremental).await;
        log::info!("{}", report);

        tokio::pin!(shutdown);
        loop {
            let batch = tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Stopping watcher");
                    break;
                }
                batch = next_batch(&mut events, quiet) => batch,
            };

            let Some(batch) = batch else {
                log::warn!("Watcher event stream closed");
                break;
            };
            log::info!("{} vault changes detected", batch.len());
            for event in &batch {
                log::debug!("{:?}", event);
            }

            // Changes that arrive during the pass queue up in the channel
            // and become the next batch
            let report = match self.try_run(SyncMode::Incremental).await {
                Some(report) => report,
                None => {
                    log::info!("A pass is in flight; running a follow-up pass after it");
                    self.run(SyncMode::Incremental).await
                }
            };
            log::info!("{}", report);
        }

        watcher.stop();
        Ok(())
    }
}
