use std::sync::Arc;

use doclink_query::{Predicate, RangeQueryPlanner};
use doclink_resolve::{InFlightSet, RelationshipResolver, ResolvedDocument};
use doclink_store::{DocumentStore, InMemoryDocumentStore};
use doclink_sync::{RelationshipSynchronizer, SyncReport, SyncState};
use doclink_types::{Document, KeyCodec, SchemaRegistry, StorageKey};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::options::{FindOptions, RemoveOutcome, WriteOutcome};

/// High-level doclink API.
///
/// Reads go planner → resolver, writes go store → synchronizer. The adapter
/// holds no per-record state; concurrent callers only share the store.
pub struct DocumentAdapter {
    config: AdapterConfig,
    store: Arc<dyn DocumentStore>,
    schema: Arc<SchemaRegistry>,
    planner: RangeQueryPlanner,
    resolver: RelationshipResolver,
    synchronizer: RelationshipSynchronizer,
}

impl DocumentAdapter {
    pub fn new(store: Arc<dyn DocumentStore>, schema: SchemaRegistry, config: AdapterConfig) -> Self {
        let schema = Arc::new(schema);
        let planner = RangeQueryPlanner::new(store.clone());
        let resolver = RelationshipResolver::new(planner.clone(), schema.clone());
        let synchronizer = RelationshipSynchronizer::new(store.clone(), schema.clone());
        info!(
            db = %config.database_name,
            types = schema.types().count(),
            expand_by_default = config.expand_by_default,
            synchronize_inverses = config.synchronize_inverses,
            "document adapter ready"
        );
        Self {
            config,
            store,
            schema,
            planner,
            resolver,
            synchronizer,
        }
    }

    /// An adapter over a fresh in-memory database named after the config.
    pub fn in_memory(schema: SchemaRegistry, config: AdapterConfig) -> Self {
        let store = Arc::new(InMemoryDocumentStore::named(config.database_name.clone()));
        Self::new(store, schema, config)
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn planner(&self) -> &RangeQueryPlanner {
        &self.planner
    }

    /// A fresh, time-ordered local id for a new record.
    pub fn generate_id(&self) -> String {
        Uuid::now_v7().to_string()
    }

    // ---- Reads ----

    pub async fn find_one(
        &self,
        doc_type: &str,
        id: &str,
        options: FindOptions,
    ) -> AdapterResult<ResolvedDocument> {
        let key = KeyCodec::encode(doc_type, id)?;
        let document = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| AdapterError::NotFound(key.clone()))?;
        let mut resolved = self.expand(vec![document], &options).await?;
        resolved.pop().ok_or(AdapterError::NotFound(key))
    }

    /// Missing ids are omitted, so the result may be shorter than `ids`.
    pub async fn find_many<S>(
        &self,
        doc_type: &str,
        ids: &[S],
        options: FindOptions,
    ) -> AdapterResult<Vec<ResolvedDocument>>
    where
        S: AsRef<str> + Sync,
    {
        let documents = self.planner.get_by_keys(doc_type, ids).await?;
        self.expand(documents, &options).await
    }

    pub async fn find_all(
        &self,
        doc_type: &str,
        options: FindOptions,
    ) -> AdapterResult<Vec<ResolvedDocument>> {
        let documents = self.planner.get_all_of_type(doc_type).await?;
        self.expand(documents, &options).await
    }

    pub async fn find_by_predicate(
        &self,
        doc_type: &str,
        predicate: &Predicate,
        options: FindOptions,
    ) -> AdapterResult<Vec<ResolvedDocument>> {
        let documents = self.planner.get_by_predicate(doc_type, predicate).await?;
        self.expand(documents, &options).await
    }

    async fn expand(
        &self,
        documents: Vec<Document>,
        options: &FindOptions,
    ) -> AdapterResult<Vec<ResolvedDocument>> {
        if !options.expand.unwrap_or(self.config.expand_by_default) {
            return Ok(documents.into_iter().map(ResolvedDocument::leaf).collect());
        }
        let in_flight = InFlightSet::new();
        let resolved = self
            .resolver
            .resolve(documents, &in_flight, &options.known)
            .await?;
        debug!(fetched = in_flight.len(), "expansion finished");
        Ok(resolved)
    }

    // ---- Writes ----

    /// Write `after` as the new state of `(record_type, record_id)`.
    ///
    /// `before` is the last state read from the store, `None` for a create.
    /// Updates use the revision on `after`, falling back to the one on
    /// `before`. Inverse documents are patched once the record is stored;
    /// their failures are listed in the outcome, not returned as an error.
    pub async fn write(
        &self,
        record_id: &str,
        record_type: &str,
        before: Option<&Document>,
        after: &Document,
    ) -> AdapterResult<WriteOutcome> {
        let key = KeyCodec::encode(record_type, record_id)?;
        check_snapshot(&key, after)?;
        self.check_relations(record_type, after)?;
        if let Some(before) = before {
            check_snapshot(&key, before)?;
            self.check_relations(record_type, before)?;
        }

        let revision = match before {
            None => self.store.put_create(after).await?,
            Some(before) => {
                let current = after
                    .revision
                    .as_ref()
                    .or(before.revision.as_ref())
                    .ok_or_else(|| AdapterError::Conflict {
                        key: key.clone(),
                        reason: "update without a revision".into(),
                    })?;
                let mut body = after.clone();
                body.revision = None;
                self.store.put_update(&body, current).await?
            }
        };
        debug!(%key, rev = %revision, created = before.is_none(), "record written");

        let sync = self.sync(&key, record_id, record_type, before, Some(after)).await?;
        Ok(WriteOutcome { revision, sync })
    }

    /// Remove the record whose last known state is `before`.
    pub async fn remove(
        &self,
        record_id: &str,
        record_type: &str,
        before: &Document,
    ) -> AdapterResult<RemoveOutcome> {
        let key = KeyCodec::encode(record_type, record_id)?;
        check_snapshot(&key, before)?;
        self.check_relations(record_type, before)?;
        let revision = before.revision.as_ref().ok_or_else(|| AdapterError::Conflict {
            key: key.clone(),
            reason: "remove without a revision".into(),
        })?;
        self.store.remove(&key, revision).await?;
        debug!(%key, "record removed");

        let sync = self.sync(&key, record_id, record_type, Some(before), None).await?;
        Ok(RemoveOutcome { sync })
    }

    /// Every relationship value of `snapshot` must match its declared kind
    /// and name ids that encode as keys of the target type. Runs before any
    /// store call so a rejected write leaves nothing behind.
    fn check_relations(&self, record_type: &str, snapshot: &Document) -> AdapterResult<()> {
        for desc in self.schema.relationships(record_type) {
            for id in desc.targets_of(snapshot)? {
                KeyCodec::encode(&desc.target_type, &id)?;
            }
        }
        Ok(())
    }

    async fn sync(
        &self,
        key: &StorageKey,
        record_id: &str,
        record_type: &str,
        before: Option<&Document>,
        after: Option<&Document>,
    ) -> AdapterResult<SyncReport> {
        if !self.config.synchronize_inverses {
            let mut report = SyncReport::new(key.clone());
            report.state = SyncState::Synced;
            return Ok(report);
        }
        Ok(self
            .synchronizer
            .synchronize(record_id, record_type, before, after)
            .await?)
    }
}

impl std::fmt::Debug for DocumentAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAdapter")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

fn check_snapshot(key: &StorageKey, snapshot: &Document) -> AdapterResult<()> {
    if snapshot.doc_type == key.doc_type() && snapshot.id == key.local_id() {
        Ok(())
    } else {
        Err(AdapterError::RecordMismatch {
            expected: key.clone(),
            found: format!("{}/{}", snapshot.doc_type, snapshot.id),
        })
    }
}
