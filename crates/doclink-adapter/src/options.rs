use std::collections::HashSet;

use doclink_sync::SyncReport;
use doclink_types::{Revision, StorageKey};

/// Per-call options for the find operations.
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    /// Expand eager relationships. `None` uses the adapter's default.
    pub expand: Option<bool>,
    /// Keys the caller already holds; they are not fetched during expansion.
    pub known: HashSet<StorageKey>,
}

impl FindOptions {
    pub fn expanded() -> Self {
        Self {
            expand: Some(true),
            ..Self::default()
        }
    }

    pub fn shallow() -> Self {
        Self {
            expand: Some(false),
            ..Self::default()
        }
    }

    pub fn with_known(mut self, keys: impl IntoIterator<Item = StorageKey>) -> Self {
        self.known.extend(keys);
        self
    }
}

/// Result of writing one record.
#[derive(Clone, Debug)]
pub struct WriteOutcome {
    /// Revision the record must present on its next write.
    pub revision: Revision,
    pub sync: SyncReport,
}

/// Result of removing one record.
#[derive(Clone, Debug)]
pub struct RemoveOutcome {
    pub sync: SyncReport,
}
