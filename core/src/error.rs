//! Error types for the storefront repository layer.
//!
//! # Design
//! Two channels are kept apart. [`ArgumentError`] reports a programming error
//! at the call boundary (empty endpoint, missing id) and is returned before
//! any request is built. Everything that can go wrong at runtime is a
//! [`RepositoryError`] and travels inside a failure
//! [`ResultEnvelope`](crate::envelope::ResultEnvelope) instead.

use thiserror::Error;
use uuid::Uuid;

use crate::envelope::Severity;

/// A required parameter was missing or malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("argument `{name}` must not be empty")]
    Empty { name: &'static str },

    #[error("argument `{name}` is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ArgumentError {
    /// Reject an empty or whitespace-only string parameter.
    pub(crate) fn require(name: &'static str, value: &str) -> Result<(), ArgumentError> {
        if value.trim().is_empty() {
            return Err(ArgumentError::Empty { name });
        }
        Ok(())
    }
}

/// Failure to obtain any HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, DNS, TLS or I/O failure.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    /// The blocking task running the request panicked or was aborted.
    #[error("transport task failed: {0}")]
    Join(String),
}

/// Runtime failure of a repository operation.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The platform answered with a non-2xx status.
    #[error("HTTP {status} {description}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: u16,
        description: String,
        /// `message` field of the platform's error document, when present.
        message: Option<String>,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request payload could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// `fetch_all` would have needed more than `max_pages` requests.
    #[error("pagination exceeded the limit of {max_pages} pages")]
    PageLimitExceeded { max_pages: u32 },

    /// A bulk status payload was tagged with a different bulk id.
    #[error("bulk status for {expected} came back tagged with {actual}")]
    CorrelationMismatch { expected: Uuid, actual: Uuid },
}

impl RepositoryError {
    pub fn severity(&self) -> Severity {
        match self {
            RepositoryError::Status { status, .. } if (400..500).contains(status) => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// HTTP status of a protocol error.
    pub fn status(&self) -> Option<u16> {
        match self {
            RepositoryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RepositoryError::Transport(TransportError::Cancelled))
    }
}

/// Invalid or unreadable configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
