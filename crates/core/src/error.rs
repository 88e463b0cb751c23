//! Error types for rcprobe-core
//!
//! Every failure a probe can hit is mapped into one [`Error`] variant. The
//! variant decides whether the orchestrator may try the fallback address
//! ([`Error::is_reachability`]) and which exit code the CLI reports.

use thiserror::Error;

/// Result type alias for rcprobe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a storage endpoint refused a request that it did answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// 401/403, bad or insufficient credentials
    Auth,
    /// 404, bucket or object does not exist
    NotFound,
    /// 409 or an object state that does not allow the operation
    Conflict,
    /// Any other HTTP error status
    Other,
}

impl RejectionKind {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => RejectionKind::Auth,
            404 => RejectionKind::NotFound,
            409 => RejectionKind::Conflict,
            _ => RejectionKind::Other,
        }
    }
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionKind::Auth => write!(f, "access denied"),
            RejectionKind::NotFound => write!(f, "not found"),
            RejectionKind::Conflict => write!(f, "conflict"),
            RejectionKind::Other => write!(f, "rejected"),
        }
    }
}

/// Main error type for probe operations
#[derive(Error, Debug)]
pub enum Error {
    /// Conflicting or missing flags, unknown upload mode
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// A credential required for the transfer is absent
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Target cannot be parsed into bucket/object or host/path
    #[error("Cannot resolve target: {0}")]
    Resolution(String),

    /// No valid HTTP response was received
    #[error("Network unreachable: {0}")]
    Reachability(String),

    /// The endpoint answered with an error status
    #[error("Remote {kind}{}: {message}", status_suffix(.status))]
    RemoteRejection {
        kind: RejectionKind,
        status: Option<u16>,
        message: String,
    },

    /// Transferred byte count does not match the expected size
    #[error("Integrity check failed: expected {expected} bytes, transferred {actual}")]
    Integrity { expected: u64, actual: u64 },

    /// Config file unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl Error {
    /// Build a rejection from an HTTP status code
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Error::RemoteRejection {
            kind: RejectionKind::from_status(status),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Build a conflict detected locally from object state
    pub fn conflict(message: impl Into<String>) -> Self {
        Error::RemoteRejection {
            kind: RejectionKind::Conflict,
            status: None,
            message: message.into(),
        }
    }

    /// Whether this failure happened before any HTTP response arrived.
    ///
    /// Only these errors allow the single fallback-address attempt.
    pub fn is_reachability(&self) -> bool {
        matches!(self, Error::Reachability(_))
    }

    /// Rejection kind, if the endpoint refused the request
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            Error::RemoteRejection { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
