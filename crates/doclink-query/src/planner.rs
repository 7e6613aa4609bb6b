//! The range query planner.
//!
//! Turns the three read access patterns doclink needs into the store's
//! primitives: batch point lookups, prefix range scans, and exact-match
//! index queries over a per-call index function.

use std::collections::HashSet;
use std::sync::Arc;

use doclink_store::{DocumentStore, ScanRow, StoreResult};
use doclink_types::{Document, KeyCodec, StorageKey};
use futures_util::TryStreamExt;
use tracing::debug;

use crate::predicate::{CompiledPredicate, Predicate};

/// Builds and runs key-range and predicate queries against a [`DocumentStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct RangeQueryPlanner {
    store: Arc<dyn DocumentStore>,
}

impl RangeQueryPlanner {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Batch point lookup of `ids` within `doc_type`.
    ///
    /// Missing documents are left out without error, so the result can be
    /// shorter than `ids`. Order follows `ids`; repeated ids are fetched once.
    pub async fn get_by_keys<S>(&self, doc_type: &str, ids: &[S]) -> StoreResult<Vec<Document>>
    where
        S: AsRef<str> + Sync,
    {
        let mut seen = HashSet::with_capacity(ids.len());
        let mut keys: Vec<StorageKey> = Vec::with_capacity(ids.len());
        for id in ids {
            let key = KeyCodec::encode(doc_type, id.as_ref())?;
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let found = self.store.get_many(&keys).await?;
        let mut documents = Vec::with_capacity(found.len());
        for (key, doc) in keys.iter().zip(found) {
            match doc {
                Some(doc) => documents.push(doc),
                None => debug!(%key, "cannot find document, omitted"),
            }
        }
        Ok(documents)
    }

    /// Every document of `doc_type`, in key order.
    pub async fn get_all_of_type(&self, doc_type: &str) -> StoreResult<Vec<Document>> {
        let range = KeyCodec::type_range(doc_type)?;
        let rows: Vec<ScanRow> = self.store.scan_range(&range, true).try_collect().await?;
        Ok(rows.into_iter().filter_map(|row| row.document).collect())
    }

    /// Documents of `doc_type` whose fields equal every clause of `predicate`.
    ///
    /// The predicate is compiled on every call; use [`Self::compile`] and
    /// [`Self::query_compiled`] to reuse the compiled form.
    pub async fn get_by_predicate(
        &self,
        doc_type: &str,
        predicate: &Predicate,
    ) -> StoreResult<Vec<Document>> {
        let compiled = Self::compile(doc_type, predicate)?;
        self.query_compiled(compiled).await
    }

    /// Compile `predicate` into an index function for `doc_type`.
    pub fn compile(doc_type: &str, predicate: &Predicate) -> StoreResult<Arc<CompiledPredicate>> {
        Ok(Arc::new(CompiledPredicate::compile(doc_type, predicate)?))
    }

    /// Run a previously compiled predicate.
    pub async fn query_compiled(
        &self,
        compiled: Arc<CompiledPredicate>,
    ) -> StoreResult<Vec<Document>> {
        let query = compiled.index_query()?;
        debug!(doc_type = compiled.doc_type(), "running predicate query");
        let rows: Vec<ScanRow> = self.store.query_index(compiled, query).try_collect().await?;
        Ok(rows.into_iter().filter_map(|row| row.document).collect())
    }
}

impl std::fmt::Debug for RangeQueryPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeQueryPlanner").finish_non_exhaustive()
    }
}
