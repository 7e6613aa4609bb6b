use doclink_store::StoreError;
use doclink_types::{Revision, StorageKey};

use crate::error::{SyncError, SyncResult};

/// Progress of one synchronize call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Unsynced,
    Patching,
    Synced,
    PartiallyFailed,
}

/// What happened to one inverse document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchAction {
    /// The inverse field was rewritten; the target now has this revision.
    Patched(Revision),
    /// The inverse field already agreed, nothing was written.
    AlreadyConsistent,
    /// The target does not exist.
    TargetMissing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchOutcome {
    pub target: StorageKey,
    pub action: PatchAction,
}

#[derive(Clone, Debug)]
pub struct FailedPatch {
    pub target: StorageKey,
    pub error: StoreError,
}

/// Result of propagating one write to the inverse side.
///
/// A report with failures is still returned as `Ok`; use
/// [`SyncReport::into_result`] to treat any failure as an error.
#[derive(Clone, Debug)]
pub struct SyncReport {
    pub record: StorageKey,
    pub state: SyncState,
    pub outcomes: Vec<PatchOutcome>,
    pub failed: Vec<FailedPatch>,
}

impl SyncReport {
    pub fn new(record: StorageKey) -> Self {
        Self {
            record,
            state: SyncState::Unsynced,
            outcomes: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    /// Number of targets actually rewritten.
    pub fn patched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, PatchAction::Patched(_)))
            .count()
    }

    pub fn failed_targets(&self) -> impl Iterator<Item = &StorageKey> {
        self.failed.iter().map(|f| &f.target)
    }

    pub fn into_result(self) -> SyncResult<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(SyncError::PartiallyFailed {
                record: self.record,
                failed: self.failed,
            })
        }
    }
}
