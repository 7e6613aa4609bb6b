use doclink_store::StoreError;
use doclink_types::ValidationError;

/// Errors from relationship resolution.
///
/// Any error fails the whole resolve call; a partially expanded graph is
/// never returned.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// A batch fetch of related documents failed.
    #[error("fetching related documents failed: {0}")]
    Store(#[from] StoreError),

    /// A relationship field held a malformed value or id.
    #[error("invalid relationship data: {0}")]
    Validation(#[from] ValidationError),
}

/// Result alias for resolve operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
