use doclink_resolve::ResolveError;
use doclink_store::StoreError;
use doclink_sync::SyncError;
use doclink_types::{StorageKey, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("document not found: {0}")]
    NotFound(StorageKey),

    /// Stale or missing revision, or a create over an existing key.
    #[error("conflict on {key}: {reason}")]
    Conflict { key: StorageKey, reason: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The snapshot handed to a write does not describe the record being written.
    #[error("snapshot {found} does not match record {expected}")]
    RecordMismatch { expected: StorageKey, found: String },

    /// Inverse patches failed after the record itself was written.
    ///
    /// Writes report these failures in their outcome instead of failing, so
    /// this variant is what `outcome.sync.into_result()?` yields for callers
    /// that want a partial sync treated as an error.
    #[error("relationship sync error: {0}")]
    Sync(SyncError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AdapterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<StoreError> for AdapterError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => Self::NotFound(key),
            StoreError::Conflict { key, reason } => Self::Conflict { key, reason },
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Validation(v) => Self::Validation(v),
            StoreError::Serialization(msg) => Self::Serialization(msg),
        }
    }
}

impl From<ResolveError> for AdapterError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Store(e) => e.into(),
            ResolveError::Validation(v) => Self::Validation(v),
        }
    }
}

impl From<SyncError> for AdapterError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(e) => e.into(),
            SyncError::Validation(v) => Self::Validation(v),
            partial @ SyncError::PartiallyFailed { .. } => Self::Sync(partial),
        }
    }
}

impl From<toml::de::Error> for AdapterError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_types::KeyCodec;

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let key = KeyCodec::encode("list", "l1").unwrap();
        assert!(AdapterError::from(StoreError::NotFound(key.clone())).is_not_found());
        assert!(AdapterError::from(StoreError::conflict(&key, "stale")).is_conflict());
        assert!(matches!(
            AdapterError::from(StoreError::Unavailable("down".into())),
            AdapterError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn nested_errors_are_flattened() {
        let err: AdapterError = ResolveError::Store(StoreError::Unavailable("down".into())).into();
        assert!(matches!(err, AdapterError::StoreUnavailable(_)));

        let key = KeyCodec::encode("list", "l1").unwrap();
        let err: AdapterError = SyncError::PartiallyFailed {
            record: key,
            failed: Vec::new(),
        }
        .into();
        assert!(matches!(err, AdapterError::Sync(SyncError::PartiallyFailed { .. })));
    }
}
