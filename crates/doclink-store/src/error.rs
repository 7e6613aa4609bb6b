use doclink_types::{StorageKey, ValidationError};

/// Errors from document store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The requested document was not found.
    #[error("document not found: {0}")]
    NotFound(StorageKey),

    /// Revision mismatch: the document already exists, or the supplied
    /// revision is stale or missing.
    #[error("conflict on {key}: {reason}")]
    Conflict { key: StorageKey, reason: String },

    /// The backend could not be reached or initialized.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A type, id, or key failed validation before reaching the backend.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn conflict(key: &StorageKey, reason: impl Into<String>) -> Self {
        Self::Conflict {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
