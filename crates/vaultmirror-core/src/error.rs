//! Error types for the mirror.
//!
//! All errors in the system are represented by the [`Error`] enum.
//! This ensures composable error handling across crates.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Classification of a failed remote call.
///
/// The kind decides whether the transport layer retries and whether a
/// failure during connection is fatal for the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Credential rejected (401/403)
    Unauthorized,
    /// Node does not exist or is not shared with the integration (404)
    NotFound,
    /// Rate limited (429)
    RateLimited,
    /// Transient server-side failure (5xx, 409 conflicts)
    Transient,
    /// Request rejected as invalid (other 4xx)
    Rejected,
    /// Connection, timeout or decode failure
    Network,
}

impl RemoteErrorKind {
    /// Map an HTTP status code to an error kind
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            409 | 500..=599 => Self::Transient,
            _ => Self::Rejected,
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not found",
            Self::RateLimited => "rate limited",
            Self::Transient => "transient",
            Self::Rejected => "rejected",
            Self::Network => "network",
        };
        f.write_str(name)
    }
}

/// The core error type for all mirror operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Invalid file path (outside vault, not UTF-8, etc.)
    #[error("Invalid file path: {reason}")]
    InvalidPath { reason: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// Persisted state could not be read or written
    #[error("State error: {reason}")]
    StateError { reason: String },

    /// Remote API call failed
    #[error("Remote error ({kind}{}): {message}", .status.map(|s| format!(", HTTP {s}")).unwrap_or_default())]
    Remote {
        kind: RemoteErrorKind,
        status: Option<u16>,
        message: String,
    },

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error
    pub fn io(err: io::Error) -> Self {
        Error::Io(err)
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Create an invalid path error
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a state store error
    pub fn state_error(reason: impl Into<String>) -> Self {
        Error::StateError {
            reason: reason.into(),
        }
    }

    /// Create a remote error
    pub fn remote(kind: RemoteErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Remote {
            kind,
            status,
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Remote error kind, if this is a remote failure
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Error::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether a retry of the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.remote_kind(),
            Some(RemoteErrorKind::RateLimited | RemoteErrorKind::Transient | RemoteErrorKind::Network)
        )
    }
}
