use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use doclink_query::RangeQueryPlanner;
use doclink_types::{Document, KeyCodec, SchemaRegistry, StorageKey};
use futures_util::future::{try_join_all, BoxFuture};
use futures_util::FutureExt;
use tracing::debug;

use crate::error::ResolveResult;
use crate::inflight::{InFlightSet, RecordCache};
use crate::resolved::{DeferredRelation, ResolvedDocument};

/// Loads the related documents of a batch of documents.
///
/// Eager relations are fetched in one batch per target type, all batches
/// concurrently, and the fetched documents are resolved recursively against
/// the same [`InFlightSet`]. Lazy relations become [`DeferredRelation`]s.
#[derive(Clone, Debug)]
pub struct RelationshipResolver {
    planner: RangeQueryPlanner,
    schema: Arc<SchemaRegistry>,
}

impl RelationshipResolver {
    pub fn new(planner: RangeQueryPlanner, schema: Arc<SchemaRegistry>) -> Self {
        Self { planner, schema }
    }

    pub fn planner(&self) -> &RangeQueryPlanner {
        &self.planner
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    /// Resolve `documents`, returning them in input order.
    ///
    /// Keys found in `cache` or already claimed in `in_flight` are not
    /// fetched and therefore not attached. A document fetched in this pass is
    /// attached to every referrer in the same batch. Missing targets are
    /// dropped; any fetch error fails the whole call.
    pub fn resolve<'a>(
        &'a self,
        documents: Vec<Document>,
        in_flight: &'a InFlightSet,
        cache: &'a dyn RecordCache,
    ) -> BoxFuture<'a, ResolveResult<Vec<ResolvedDocument>>> {
        async move {
            // Claim the batch itself so back-references are not refetched.
            for doc in &documents {
                in_flight.try_claim(&doc.key()?);
            }

            let mut batches: BTreeMap<&str, Vec<String>> = BTreeMap::new();
            let mut deferred = Vec::with_capacity(documents.len());
            for doc in &documents {
                let mut lazy = BTreeMap::new();
                for desc in self.schema.relationships(&doc.doc_type) {
                    let ids = desc.targets_of(doc)?;
                    if desc.lazy {
                        lazy.insert(
                            desc.field_name.clone(),
                            DeferredRelation::new(
                                self.planner.clone(),
                                desc.target_type.clone(),
                                ids,
                            ),
                        );
                        continue;
                    }
                    for id in ids {
                        let key = KeyCodec::encode(&desc.target_type, &id)?;
                        if cache.contains(&key) {
                            debug!(%key, "related document cached by caller, skipped");
                        } else if !in_flight.try_claim(&key) {
                            debug!(%key, "related document already in flight, skipped");
                        } else {
                            batches.entry(desc.target_type.as_str()).or_default().push(id);
                        }
                    }
                }
                deferred.push(lazy);
            }

            let fetched = try_join_all(
                batches
                    .into_iter()
                    .map(|(target_type, ids)| self.fetch_batch(target_type, ids, in_flight, cache)),
            )
            .await?;

            let mut by_key: HashMap<StorageKey, ResolvedDocument> = HashMap::new();
            for resolved in fetched.into_iter().flatten() {
                by_key.insert(resolved.document.key()?, resolved);
            }

            let mut out = Vec::with_capacity(documents.len());
            for (document, deferred) in documents.into_iter().zip(deferred) {
                let mut related = BTreeMap::new();
                for desc in self.schema.relationships(&document.doc_type) {
                    if desc.lazy {
                        continue;
                    }
                    let mut attached = Vec::new();
                    for id in document.related_ids(&desc.field_name) {
                        let key = KeyCodec::encode(&desc.target_type, &id)?;
                        if let Some(found) = by_key.get(&key) {
                            attached.push(found.clone());
                        }
                    }
                    if !attached.is_empty() {
                        related.insert(desc.field_name.clone(), attached);
                    }
                }
                out.push(ResolvedDocument {
                    document,
                    related,
                    deferred,
                });
            }
            Ok(out)
        }
        .boxed()
    }

    async fn fetch_batch(
        &self,
        target_type: &str,
        ids: Vec<String>,
        in_flight: &InFlightSet,
        cache: &dyn RecordCache,
    ) -> ResolveResult<Vec<ResolvedDocument>> {
        let documents = self.planner.get_by_keys(target_type, &ids).await?;
        debug!(
            target_type,
            requested = ids.len(),
            found = documents.len(),
            "related batch fetched"
        );
        self.resolve(documents, in_flight, cache).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use doclink_store::{DocumentStore, InMemoryDocumentStore, ReadCountingStore, StoreError};
    use doclink_types::{RelationValue, RelationshipDescriptor, ValidationError};

    use crate::error::ResolveError;
    use crate::inflight::NoCache;

    fn schema() -> Arc<SchemaRegistry> {
        Arc::new(
            SchemaRegistry::builder()
                .register(
                    "list",
                    vec![RelationshipDescriptor::has_many("items", "item").inverse("list")],
                )
                .register(
                    "item",
                    vec![
                        RelationshipDescriptor::belongs_to("list", "list").inverse("items"),
                        RelationshipDescriptor::has_many("tags", "tag").lazy(),
                    ],
                )
                .register("tag", Vec::new())
                .build()
                .unwrap(),
        )
    }

    type CountingStore = ReadCountingStore<InMemoryDocumentStore>;

    async fn setup(docs: Vec<Document>) -> (Arc<CountingStore>, RelationshipResolver) {
        let store = Arc::new(ReadCountingStore::new(InMemoryDocumentStore::new()));
        for doc in &docs {
            store.put_create(doc).await.unwrap();
        }
        let resolver = RelationshipResolver::new(RangeQueryPlanner::new(store.clone()), schema());
        (store, resolver)
    }

    fn key(t: &str, id: &str) -> StorageKey {
        KeyCodec::encode(t, id).unwrap()
    }

    async fn load(store: &CountingStore, t: &str, id: &str) -> Document {
        store.get(&key(t, id)).await.unwrap().unwrap()
    }

    // -----------------------------------------------------------------------
    // Expansion
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn has_many_with_missing_target() {
        let (store, resolver) = setup(vec![
            Document::new("list", "l1").with_has_many("items", ["i1", "i2"]),
            Document::new("item", "i1").with_belongs_to("list", Some("l1")),
        ])
        .await;
        let l1 = load(&store, "list", "l1").await;

        let resolved = resolver
            .resolve(vec![l1], &InFlightSet::new(), &NoCache)
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].related_ids("items"), vec!["i1"]);
    }

    #[tokio::test]
    async fn related_order_follows_field_order() {
        let (store, resolver) = setup(vec![
            Document::new("list", "l1").with_has_many("items", ["i3", "i1", "i2"]),
            Document::new("item", "i1"),
            Document::new("item", "i2"),
            Document::new("item", "i3"),
        ])
        .await;
        let l1 = load(&store, "list", "l1").await;
        let resolved = resolver
            .resolve(vec![l1], &InFlightSet::new(), &NoCache)
            .await
            .unwrap();
        assert_eq!(resolved[0].related_ids("items"), vec!["i3", "i1", "i2"]);
    }

    #[tokio::test]
    async fn recursion_stops_at_claimed_keys() {
        let (store, resolver) = setup(vec![
            Document::new("list", "l1").with_has_many("items", ["i1", "i2"]),
            Document::new("item", "i1").with_belongs_to("list", Some("l1")),
            Document::new("item", "i2").with_belongs_to("list", Some("l1")),
        ])
        .await;
        let i1 = load(&store, "item", "i1").await;
        store.reset();

        let in_flight = InFlightSet::new();
        let resolved = resolver
            .resolve(vec![i1], &in_flight, &NoCache)
            .await
            .unwrap();

        let list = &resolved[0].related("list")[0];
        assert_eq!(list.document.id, "l1");
        // i1 is the root of the pass, so only i2 is loaded under the list.
        assert_eq!(list.related_ids("items"), vec!["i2"]);
        assert!(list.related("items")[0].related("list").is_empty());
        assert_eq!(store.read_count(&key("item", "i1")), 0);
        assert_eq!(store.read_count(&key("list", "l1")), 1);
        assert_eq!(store.total_reads(), 2);
        assert_eq!(in_flight.len(), 3);
    }

    #[tokio::test]
    async fn shared_target_fetched_once_and_attached_to_all() {
        let (store, resolver) = setup(vec![
            Document::new("item", "i1").with_belongs_to("list", Some("x")),
            Document::new("item", "i2").with_belongs_to("list", Some("x")),
            Document::new("list", "x"),
        ])
        .await;
        let docs = vec![load(&store, "item", "i1").await, load(&store, "item", "i2").await];
        let before = store.read_count(&key("list", "x"));

        let resolved = resolver
            .resolve(docs, &InFlightSet::new(), &NoCache)
            .await
            .unwrap();
        assert_eq!(store.read_count(&key("list", "x")) - before, 1);
        assert_eq!(resolved[0].related_ids("list"), vec!["x"]);
        assert_eq!(resolved[1].related_ids("list"), vec!["x"]);
    }

    #[tokio::test]
    async fn cached_keys_are_not_fetched() {
        let (store, resolver) = setup(vec![
            Document::new("list", "l1").with_has_many("items", ["i1", "i2"]),
            Document::new("item", "i1"),
            Document::new("item", "i2"),
        ])
        .await;
        let l1 = load(&store, "list", "l1").await;
        let cache: HashSet<StorageKey> = [key("item", "i1")].into_iter().collect();

        let resolved = resolver
            .resolve(vec![l1], &InFlightSet::new(), &cache)
            .await
            .unwrap();
        assert_eq!(store.read_count(&key("item", "i1")), 0);
        assert_eq!(resolved[0].related_ids("items"), vec!["i2"]);
    }

    #[tokio::test]
    async fn documents_without_schema_resolve_as_leaves() {
        let (_, resolver) = setup(Vec::new()).await;
        let doc = Document::new("note", "n1").with_belongs_to("list", Some("l1"));
        let resolved = resolver
            .resolve(vec![doc.clone()], &InFlightSet::new(), &NoCache)
            .await
            .unwrap();
        assert_eq!(resolved, vec![ResolvedDocument::leaf(doc)]);
    }

    // -----------------------------------------------------------------------
    // Lazy relations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn lazy_relation_is_deferred() {
        let (store, resolver) = setup(vec![
            Document::new("item", "i1").with_has_many("tags", ["t1", "t2"]),
            Document::new("tag", "t1"),
        ])
        .await;
        let i1 = load(&store, "item", "i1").await;
        let resolved = resolver
            .resolve(vec![i1], &InFlightSet::new(), &NoCache)
            .await
            .unwrap();

        assert!(resolved[0].related("tags").is_empty());
        assert_eq!(store.read_count(&key("tag", "t1")), 0);

        let tags = resolved[0].deferred("tags").expect("deferred handle");
        assert_eq!(tags.target_type(), "tag");
        assert_eq!(tags.ids(), ["t1".to_string(), "t2".to_string()]);

        let loaded = tags.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        tags.load().await.unwrap();
        assert_eq!(store.read_count(&key("tag", "t1")), 2);
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fetch_failure_fails_whole_resolve() {
        let (store, resolver) = setup(vec![
            Document::new("list", "l1").with_has_many("items", ["i1"]),
            Document::new("item", "i1"),
        ])
        .await;
        let l1 = load(&store, "list", "l1").await;
        store.inner().set_available(false);

        let err = resolver
            .resolve(vec![l1], &InFlightSet::new(), &NoCache)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn mis_shaped_relation_is_rejected() {
        let (_, resolver) = setup(Vec::new()).await;
        let mut doc = Document::new("list", "l1");
        doc.relationships
            .insert("items".into(), RelationValue::BelongsTo(Some("i1".into())));
        let err = resolver
            .resolve(vec![doc], &InFlightSet::new(), &NoCache)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Validation(ValidationError::RelationShape { .. })
        ));
    }
}
