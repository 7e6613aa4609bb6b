//! Revisioned document store interface for doclink.
//!
//! The store is the external collaborator doclink is written against: a
//! key-addressed, schema-less document database where each document is read
//! and written whole and carries an opaque revision token. Think CouchDB or
//! PouchDB: ordered primary keys, ad-hoc map functions, no joins, no
//! multi-document transactions.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`InMemoryDocumentStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! [`ReadCountingStore`] wraps any backend and counts point reads per key.
//!
//! # Design Rules
//!
//! 1. Writes are optimistic: updates and removals present the last revision seen.
//! 2. Keys sort lexicographically, so each document type is one key range.
//! 3. Secondary lookups are emulated with per-query [`IndexFunction`]s.
//! 4. Scans are streams; a failed scan surfaces its error instead of rows.
//! 5. All backend errors are propagated, never silently ignored.

pub mod counting;
pub mod error;
pub mod index;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use counting::ReadCountingStore;
pub use error::{StoreError, StoreResult};
pub use index::{collate, collate_keys, IndexFunction, IndexKey, IndexMatch, IndexQuery};
pub use memory::InMemoryDocumentStore;
pub use traits::{DocumentStore, DocumentStream, ScanRow};
