use doclink_store::StoreError;
use doclink_types::{StorageKey, ValidationError};
use thiserror::Error;

use crate::types::FailedPatch;

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Some inverse patches failed. The others were applied and stay applied.
    #[error("inverse patches failed for {record}: {}", describe(.failed))]
    PartiallyFailed {
        record: StorageKey,
        failed: Vec<FailedPatch>,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn describe(failed: &[FailedPatch]) -> String {
    failed
        .iter()
        .map(|f| format!("{} ({})", f.target, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type SyncResult<T> = Result<T, SyncError>;
