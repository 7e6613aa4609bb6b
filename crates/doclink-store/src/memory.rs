use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use doclink_types::{Document, KeyRange, Revision, StorageKey};
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::index::{IndexFunction, IndexQuery};
use crate::traits::{DocumentStream, DocumentStore, ScanRow};

/// Number of hex characters of the body digest kept in a revision token.
const REVISION_DIGEST_LEN: usize = 16;

#[derive(Clone, Debug)]
struct StoredEntry {
    generation: u64,
    document: Document,
}

/// In-memory, `BTreeMap`-based document store.
///
/// Intended for tests and embedding. Documents are kept in key order behind a
/// `RwLock` and cloned on read/write. Revisions are `"{generation}-{digest}"`
/// where the digest is a BLAKE3 hash of the JSON body.
pub struct InMemoryDocumentStore {
    name: String,
    documents: RwLock<BTreeMap<StorageKey, StoredEntry>>,
    available: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create a new empty store with a database name (used in logs only).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulate the backend going away (or coming back).
    ///
    /// While unavailable every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "database {:?} is offline",
                self.name
            )))
        }
    }

    fn snapshot_rows<F>(&self, range: Option<&KeyRange>, mut row: F) -> StoreResult<Vec<ScanRow>>
    where
        F: FnMut(&StorageKey, &StoredEntry) -> Option<ScanRow>,
    {
        let documents = self.documents.read().map_err(poisoned)?;
        let rows = match range {
            Some(range) if range.is_empty() => Vec::new(),
            Some(range) => documents
                .range::<str, _>((
                    Bound::Included(range.start.as_str()),
                    Bound::Excluded(range.end.as_str()),
                ))
                .filter_map(|(k, e)| row(k, e))
                .collect(),
            None => documents.iter().filter_map(|(k, e)| row(k, e)).collect(),
        };
        Ok(rows)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

fn revision_for(generation: u64, document: &Document) -> StoreResult<Revision> {
    let mut body = document.clone();
    body.revision = None;
    let bytes = serde_json::to_vec(&body)?;
    let digest = blake3::hash(&bytes);
    let hex = hex::encode(digest.as_bytes());
    Ok(Revision::new(format!(
        "{generation}-{}",
        &hex[..REVISION_DIGEST_LEN]
    )))
}

fn into_stream(result: StoreResult<Vec<ScanRow>>) -> DocumentStream {
    match result {
        Ok(rows) => stream::iter(rows.into_iter().map(Ok)).boxed(),
        Err(e) => stream::iter(std::iter::once(Err(e))).boxed(),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, key: &StorageKey) -> StoreResult<Option<Document>> {
        self.check_available()?;
        let documents = self.documents.read().map_err(poisoned)?;
        Ok(documents.get(key).map(|e| e.document.clone()))
    }

    async fn get_many(&self, keys: &[StorageKey]) -> StoreResult<Vec<Option<Document>>> {
        self.check_available()?;
        let documents = self.documents.read().map_err(poisoned)?;
        Ok(keys
            .iter()
            .map(|k| documents.get(k).map(|e| e.document.clone()))
            .collect())
    }

    async fn put_create(&self, document: &Document) -> StoreResult<Revision> {
        self.check_available()?;
        let key = document.key()?;
        if document.revision.is_some() {
            return Err(StoreError::conflict(
                &key,
                "a new document must not carry a revision",
            ));
        }
        let mut documents = self.documents.write().map_err(poisoned)?;
        if documents.contains_key(&key) {
            return Err(StoreError::conflict(&key, "document already exists"));
        }
        let revision = revision_for(1, document)?;
        let mut stored = document.clone();
        stored.revision = Some(revision.clone());
        documents.insert(
            key.clone(),
            StoredEntry {
                generation: 1,
                document: stored,
            },
        );
        debug!(db = %self.name, %key, rev = %revision, "document created");
        Ok(revision)
    }

    async fn put_update(&self, document: &Document, revision: &Revision) -> StoreResult<Revision> {
        self.check_available()?;
        let key = document.key()?;
        let mut documents = self.documents.write().map_err(poisoned)?;
        let entry = documents
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if entry.document.revision.as_ref() != Some(revision) {
            return Err(StoreError::conflict(
                &key,
                format!("stale revision {revision}"),
            ));
        }
        let generation = entry.generation + 1;
        let next = revision_for(generation, document)?;
        let mut stored = document.clone();
        stored.revision = Some(next.clone());
        *entry = StoredEntry {
            generation,
            document: stored,
        };
        debug!(db = %self.name, %key, rev = %next, "document updated");
        Ok(next)
    }

    async fn remove(&self, key: &StorageKey, revision: &Revision) -> StoreResult<()> {
        self.check_available()?;
        let mut documents = self.documents.write().map_err(poisoned)?;
        let entry = documents
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if entry.document.revision.as_ref() != Some(revision) {
            return Err(StoreError::conflict(key, format!("stale revision {revision}")));
        }
        documents.remove(key);
        debug!(db = %self.name, %key, "document removed");
        Ok(())
    }

    fn scan_range(&self, range: &KeyRange, include_body: bool) -> DocumentStream {
        let rows = self.check_available().and_then(|()| {
            self.snapshot_rows(Some(range), |key, entry| {
                Some(ScanRow {
                    key: key.clone(),
                    revision: entry.document.revision.clone()?,
                    document: include_body.then(|| entry.document.clone()),
                })
            })
        });
        into_stream(rows)
    }

    fn query_index(&self, index: Arc<dyn IndexFunction>, query: IndexQuery) -> DocumentStream {
        let rows = self.check_available().and_then(|()| {
            self.snapshot_rows(query.within.as_ref(), |key, entry| {
                let emitted = index.emit(&entry.document)?;
                if !query.accepts(key.as_str(), &emitted) {
                    return None;
                }
                Some(ScanRow {
                    key: key.clone(),
                    revision: entry.document.revision.clone()?,
                    document: Some(entry.document.clone()),
                })
            })
        });
        debug!(db = %self.name, index = index.name(), ok = rows.is_ok(), "index query evaluated");
        into_stream(rows)
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("name", &self.name)
            .field("document_count", &self.len())
            .finish()
    }
}
