//! Relationship resolution for doclink.
//!
//! Given documents already loaded from the store, the resolver loads the
//! documents their relationship fields point at, without any cross-document
//! index: every related id becomes a storage key and ids of the same target
//! type are fetched in one batch point lookup.
//!
//! # Deduplication
//!
//! Every top-level resolve call gets its own [`InFlightSet`]. A key is
//! fetched at most once per call tree, however many documents reference it
//! and however deep the recursion goes. Keys the caller already holds can be
//! excluded through a [`RecordCache`].
//!
//! # Failure
//!
//! Batches are joined fail-fast. A failed fetch fails the whole call; a
//! partially expanded graph is never returned.

pub mod error;
pub mod inflight;
pub mod resolved;
pub mod resolver;

pub use error::{ResolveError, ResolveResult};
pub use inflight::{InFlightSet, NoCache, RecordCache};
pub use resolved::{DeferredRelation, ResolvedDocument};
pub use resolver::RelationshipResolver;
