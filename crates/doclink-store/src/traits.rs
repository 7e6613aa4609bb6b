use std::sync::Arc;

use async_trait::async_trait;
use doclink_types::{Document, KeyRange, Revision, StorageKey};
use futures_util::stream::BoxStream;

use crate::error::StoreResult;
use crate::index::{IndexFunction, IndexQuery};

/// One row produced by a range scan or index query.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanRow {
    pub key: StorageKey,
    pub revision: Revision,
    /// `None` when the scan was asked to skip bodies.
    pub document: Option<Document>,
}

/// A finite, lazily consumed sequence of scan rows.
///
/// Each call to a scanning method returns a fresh stream; an `Err` item ends
/// the useful part of the stream.
pub type DocumentStream = BoxStream<'static, StoreResult<ScanRow>>;

/// Key-addressed, revisioned document store.
///
/// All implementations must satisfy these invariants:
/// - Documents are read and written whole; there are no partial updates.
/// - Every successful write returns a fresh [`Revision`]; updates and removals
///   must present the current one or fail with `Conflict`.
/// - Creation must not carry a revision and fails with `Conflict` if the key
///   already exists.
/// - Scans return rows in ascending key order.
/// - There are no multi-document transactions and no cross-document locks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document by key, with its current revision set.
    ///
    /// Returns `Ok(None)` if no document is stored under `key`.
    async fn get(&self, key: &StorageKey) -> StoreResult<Option<Document>>;

    /// Batch point lookup; the result is positionally aligned with `keys`.
    ///
    /// Default implementation calls `get()` for each key. Backends may
    /// override for fewer round-trips.
    async fn get_many(&self, keys: &[StorageKey]) -> StoreResult<Vec<Option<Document>>> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            found.push(self.get(key).await?);
        }
        Ok(found)
    }

    /// Store a new document. Its `revision` must be `None`.
    async fn put_create(&self, document: &Document) -> StoreResult<Revision>;

    /// Replace an existing document, checking `revision` against the stored one.
    async fn put_update(&self, document: &Document, revision: &Revision) -> StoreResult<Revision>;

    /// Delete a document, checking `revision` against the stored one.
    async fn remove(&self, key: &StorageKey, revision: &Revision) -> StoreResult<()>;

    /// Scan all rows whose key lies in `range`, in key order.
    fn scan_range(&self, range: &KeyRange, include_body: bool) -> DocumentStream;

    /// Evaluate `index` over candidate documents and return those whose
    /// emitted key satisfies `query`, in key order, bodies included.
    fn query_index(&self, index: Arc<dyn IndexFunction>, query: IndexQuery) -> DocumentStream;
}
