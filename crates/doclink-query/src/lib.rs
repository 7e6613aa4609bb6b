//! Read-side query planning for doclink.
//!
//! The store has no secondary indexes and no joins. Everything doclink reads
//! is expressed as one of three primitives:
//!
//! - batch point lookups by storage key ([`RangeQueryPlanner::get_by_keys`])
//! - a prefix range scan over one document type ([`RangeQueryPlanner::get_all_of_type`])
//! - an exact-match query over a per-call index function built from a
//!   [`Predicate`] ([`RangeQueryPlanner::get_by_predicate`])
//!
//! Missing documents in a point lookup are omitted, never reported. Scan and
//! query failures are surfaced unchanged and never produce a partial result.

pub mod planner;
pub mod predicate;

pub use planner::RangeQueryPlanner;
pub use predicate::{CompiledPredicate, Predicate, ID_FIELD};
