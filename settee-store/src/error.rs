//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a document store.
///
/// The variants mirror CouchDB's `{"error": ..., "reason": ...}` responses so
/// that in-memory and HTTP stores fail the same way.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document (or view) does not exist. `reason` is `missing`,
    /// `deleted` or `missing_named_view`.
    #[error("not found: {reason}")]
    NotFound { reason: String },

    /// The presented revision does not match the current one.
    #[error("document update conflict: {reason}")]
    Conflict { reason: String },

    /// Credentials were rejected.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The store rejected the request as malformed.
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    /// Any other non-success response.
    #[error("store returned {status} {error}: {reason}")]
    Api {
        status: u16,
        error: String,
        reason: String,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid store configuration (URL, credentials).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn missing() -> Self {
        StoreError::NotFound {
            reason: "missing".to_string(),
        }
    }

    pub(crate) fn deleted() -> Self {
        StoreError::NotFound {
            reason: "deleted".to_string(),
        }
    }

    pub(crate) fn conflict() -> Self {
        StoreError::Conflict {
            reason: "Document update conflict.".to_string(),
        }
    }

    /// Returns true if this error is a revision conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Returns true if the document never existed.
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::NotFound { reason } if reason == "missing")
    }

    /// Returns true if the document exists only as a deletion tombstone.
    pub fn is_deleted(&self) -> bool {
        matches!(self, StoreError::NotFound { reason } if reason == "deleted")
    }

    /// The store-supplied reason, when there is one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            StoreError::NotFound { reason }
            | StoreError::Conflict { reason }
            | StoreError::Unauthorized { reason }
            | StoreError::BadRequest { reason }
            | StoreError::Api { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
