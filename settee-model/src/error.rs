//! Error types for the model layer.

use settee_store::StoreError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Structurally invalid input: a bad schema definition, a missing id, an
    /// undeclared field. Raised before any store call.
    #[error("configuration error: {0}")]
    Config(String),

    /// The store's error, passed through unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ModelError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ModelError::Config(message.into())
    }

    /// Returns true for configuration (programmer) errors.
    pub fn is_config(&self) -> bool {
        matches!(self, ModelError::Config(_))
    }

    /// The underlying store error, if this came from the store.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ModelError::Store(e) => Some(e),
            ModelError::Config(_) => None,
        }
    }

    /// Returns true if the store reported a revision conflict.
    pub fn is_conflict(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_conflict)
    }
}
