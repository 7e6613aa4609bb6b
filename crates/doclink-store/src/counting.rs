use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use doclink_types::{Document, KeyRange, Revision, StorageKey};

use crate::error::StoreResult;
use crate::index::{IndexFunction, IndexQuery};
use crate::traits::{DocumentStore, DocumentStream};

/// A store wrapper that counts point reads per key.
///
/// Every `get` and every key of a `get_many` is counted; writes and scans
/// pass straight through. The counts live as long as the wrapper, so wrap a
/// store only for the scope you want to measure and [`reset`] between runs.
///
/// [`reset`]: ReadCountingStore::reset
pub struct ReadCountingStore<S> {
    inner: S,
    reads: Mutex<HashMap<StorageKey, usize>>,
}

impl<S: DocumentStore> ReadCountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// How many point reads have touched `key`.
    pub fn read_count(&self, key: &StorageKey) -> usize {
        self.reads
            .lock()
            .map(|r| r.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total point reads across all keys.
    pub fn total_reads(&self) -> usize {
        self.reads.lock().map(|r| r.values().sum()).unwrap_or(0)
    }

    /// Forget all counts.
    pub fn reset(&self) {
        if let Ok(mut reads) = self.reads.lock() {
            reads.clear();
        }
    }

    fn record(&self, keys: &[StorageKey]) {
        if let Ok(mut reads) = self.reads.lock() {
            for key in keys {
                *reads.entry(key.clone()).or_insert(0) += 1;
            }
        }
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for ReadCountingStore<S> {
    async fn get(&self, key: &StorageKey) -> StoreResult<Option<Document>> {
        self.record(std::slice::from_ref(key));
        self.inner.get(key).await
    }

    async fn get_many(&self, keys: &[StorageKey]) -> StoreResult<Vec<Option<Document>>> {
        self.record(keys);
        self.inner.get_many(keys).await
    }

    async fn put_create(&self, document: &Document) -> StoreResult<Revision> {
        self.inner.put_create(document).await
    }

    async fn put_update(&self, document: &Document, revision: &Revision) -> StoreResult<Revision> {
        self.inner.put_update(document, revision).await
    }

    async fn remove(&self, key: &StorageKey, revision: &Revision) -> StoreResult<()> {
        self.inner.remove(key, revision).await
    }

    fn scan_range(&self, range: &KeyRange, include_body: bool) -> DocumentStream {
        self.inner.scan_range(range, include_body)
    }

    fn query_index(&self, index: Arc<dyn IndexFunction>, query: IndexQuery) -> DocumentStream {
        self.inner.query_index(index, query)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for ReadCountingStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadCountingStore")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDocumentStore;
    use doclink_types::KeyCodec;

    fn key(t: &str, id: &str) -> StorageKey {
        KeyCodec::encode(t, id).unwrap()
    }

    #[tokio::test]
    async fn counts_point_reads_per_key() {
        let store = ReadCountingStore::new(InMemoryDocumentStore::new());
        store.put_create(&Document::new("list", "l1")).await.unwrap();
        assert_eq!(store.total_reads(), 0);

        store.get(&key("list", "l1")).await.unwrap();
        let found = store
            .get_many(&[key("list", "l1"), key("list", "l2")])
            .await
            .unwrap();
        assert!(found[0].is_some());
        assert!(found[1].is_none());

        assert_eq!(store.read_count(&key("list", "l1")), 2);
        assert_eq!(store.read_count(&key("list", "l2")), 1);
        assert_eq!(store.total_reads(), 3);
    }

    #[tokio::test]
    async fn reset_clears_counts() {
        let store = ReadCountingStore::new(InMemoryDocumentStore::new());
        store.get(&key("list", "l1")).await.unwrap();
        store.reset();
        assert_eq!(store.read_count(&key("list", "l1")), 0);
        assert_eq!(store.total_reads(), 0);
    }

    #[tokio::test]
    async fn failed_reads_are_still_counted() {
        let store = ReadCountingStore::new(InMemoryDocumentStore::new());
        store.inner().set_available(false);
        assert!(store.get(&key("list", "l1")).await.is_err());
        assert_eq!(store.read_count(&key("list", "l1")), 1);
    }
}
