//! Inverse relationship synchronization for doclink.
//!
//! The store has no foreign keys, so when a document's relationship field
//! changes, the documents on the other side must be patched by hand. Given
//! the before and after snapshot of a write, the synchronizer computes which
//! ids were added and removed per two-way field, loads each affected target,
//! fixes its inverse field, and writes it back under the revision it read.
//!
//! Patches run concurrently and independently. A failure on one target never
//! stops or undoes the others; it is reported in the [`SyncReport`].

pub mod error;
pub mod synchronizer;
pub mod types;

pub use error::{SyncError, SyncResult};
pub use synchronizer::RelationshipSynchronizer;
pub use types::{FailedPatch, PatchAction, PatchOutcome, SyncReport, SyncState};
