//! Configuration types for the mirror.
//!
//! Follows a builder pattern for complex configuration with validation.
//! [`MirrorConfig::load`] layers an optional YAML file under environment
//! variables prefixed with `VAULTMIRROR_`; command-line flags are applied on
//! top by the binary.

use crate::error::{Error, Result};
use crate::resilience::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Notion-compatible API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.notion.com/v1";
/// Default protocol version header value
pub const DEFAULT_API_VERSION: &str = "2022-06-28";
/// Remote per-block character limit
pub const DEFAULT_MAX_BLOCK_CHARS: usize = 2000;
/// Blocks per create/append request
pub const DEFAULT_BATCH_SIZE: usize = 30;

/// API credential that never shows up in logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential, for building request headers
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(***)")
        }
    }
}

/// Tunables of the sync engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Maximum characters of text in one block
    pub max_block_chars: usize,
    /// Blocks per create/append request
    pub batch_size: usize,
    /// Pause between consecutive successful writes and between deletes
    pub request_delay_ms: u64,
    /// Archive requests issued before pausing during a full resync
    pub delete_batch_size: usize,
    /// Per-document errors kept in the pass report
    pub max_reported_errors: usize,
    /// Use modification time as a pre-filter before hashing content
    pub trust_mtime: bool,
    /// Send frontmatter as page properties.
    ///
    /// Pages whose parent is a plain page only accept a title, so this only
    /// works when the root is a database with matching rich-text columns.
    pub sync_properties: bool,
    /// Archive remote pages whose local document disappeared
    pub archive_deleted: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_block_chars: DEFAULT_MAX_BLOCK_CHARS,
            batch_size: DEFAULT_BATCH_SIZE,
            request_delay_ms: 200,
            delete_batch_size: 10,
            max_reported_errors: 10,
            trust_mtime: true,
            sync_properties: false,
            archive_deleted: false,
        }
    }
}

impl SyncSettings {
    /// Courtesy delay between remote writes
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Validate limits
    pub fn validate(&self) -> Result<()> {
        if self.max_block_chars == 0 {
            return Err(Error::config_error("max_block_chars must be positive"));
        }
        if self.batch_size == 0 {
            return Err(Error::config_error("batch_size must be positive"));
        }
        if self.delete_batch_size == 0 {
            return Err(Error::config_error("delete_batch_size must be positive"));
        }
        Ok(())
    }
}

/// Complete configuration of one vault → workspace mirror
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Path to the vault directory
    pub vault_path: PathBuf,
    /// Remote page that receives the mirrored tree
    pub root_page_id: String,
    /// Bearer credential of the remote integration
    #[serde(skip_serializing)]
    pub api_token: Secret,
    /// Base URL of the remote API
    pub api_base_url: String,
    /// Protocol version header value
    pub api_version: String,
    /// Vault-relative path prefixes that are never mirrored
    pub excluded_paths: Vec<String>,
    /// File extensions (with leading dot) that are mirrored
    pub allowed_extensions: Vec<String>,
    /// Per-request timeout enforced by the HTTP client
    pub request_timeout_secs: u64,
    /// Override for the state directory
    pub state_dir: Option<PathBuf>,
    pub sync: SyncSettings,
    pub retry: RetryConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            vault_path: PathBuf::new(),
            root_page_id: String::new(),
            api_token: Secret::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            excluded_paths: [".obsidian", ".trash", ".git"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_extensions: vec![".md".to_string()],
            request_timeout_secs: 30,
            state_dir: None,
            sync: SyncSettings::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl MirrorConfig {
    /// Create a new config with builder
    pub fn builder(vault_path: impl Into<PathBuf>, root_page_id: impl Into<String>) -> MirrorConfigBuilder {
        MirrorConfigBuilder::new(vault_path, root_page_id)
    }

    /// Load configuration from an optional YAML file and the environment.
    ///
    /// Environment variables use the `VAULTMIRROR_` prefix and `__` for
    /// nesting, e.g. `VAULTMIRROR_SYNC__BATCH_SIZE=20`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            if !path.exists() {
                return Err(Error::config_error(format!(
                    "Config file does not exist: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Yaml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VAULTMIRROR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("excluded_paths")
                .with_list_parse_key("allowed_extensions"),
        );

        let layered = builder
            .build()
            .map_err(|e| Error::config_error(format!("Failed to read configuration: {}", e)))?;

        let config: MirrorConfig = layered
            .try_deserialize()
            .map_err(|e| Error::config_error(format!("Invalid configuration: {}", e)))?;

        Ok(config.expanded())
    }

    /// Expand `~` and environment variables in path settings
    pub fn expanded(mut self) -> Self {
        self.vault_path = expand_path(&self.vault_path);
        self.state_dir = self.state_dir.as_deref().map(expand_path);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.vault_path.as_os_str().is_empty() {
            return Err(Error::config_error("vault_path must be set"));
        }

        if !self.vault_path.is_dir() {
            return Err(Error::config_error(format!(
                "Vault path is not a directory: {}",
                self.vault_path.display()
            )));
        }

        if self.root_page_id.trim().is_empty() {
            return Err(Error::config_error("root_page_id must be set"));
        }

        if self.api_token.is_empty() {
            return Err(Error::config_error(
                "API token missing (set NOTION_TOKEN or api_token)",
            ));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(Error::config_error(format!(
                "api_base_url must be an http(s) URL: {}",
                self.api_base_url
            )));
        }

        if self.allowed_extensions.is_empty() {
            return Err(Error::config_error("allowed_extensions cannot be empty"));
        }

        self.sync.validate()?;
        self.retry.validate()?;
        Ok(())
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::warn!("Failed to expand path {}: {}", raw, e);
            path.to_path_buf()
        }
    }
}

/// Builder for MirrorConfig
pub struct MirrorConfigBuilder {
    config: MirrorConfig,
}

impl MirrorConfigBuilder {
    /// Create a new builder
    pub fn new(vault_path: impl Into<PathBuf>, root_page_id: impl Into<String>) -> Self {
        Self {
            config: MirrorConfig {
                vault_path: vault_path.into(),
                root_page_id: root_page_id.into(),
                ..MirrorConfig::default()
            },
        }
    }

    /// Set the API credential
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Secret::new(token);
        self
    }

    /// Set the API base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    /// Add an excluded path prefix
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        self.config.excluded_paths.push(prefix.into());
        self
    }

    /// Replace the sync settings
    pub fn sync_settings(mut self, settings: SyncSettings) -> Self {
        self.config.sync = settings;
        self
    }

    /// Replace the retry policy
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Override the state directory
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.state_dir = Some(dir.into());
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<MirrorConfig> {
        let config = self.config.expanded();
        config.validate()?;
        Ok(config)
    }
}
