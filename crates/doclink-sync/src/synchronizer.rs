use std::collections::HashMap;
use std::sync::Arc;

use doclink_store::{DocumentStore, StoreError, StoreResult};
use doclink_types::{
    Document, KeyCodec, RelationKind, RelationValue, RelationshipDescriptor, SchemaRegistry,
    StorageKey,
};
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::types::{FailedPatch, PatchAction, PatchOutcome, SyncReport, SyncState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EditOp {
    Strip,
    Attach,
}

/// One change to one inverse field of one target document.
#[derive(Clone, Debug)]
struct InverseEdit<'s> {
    inverse: &'s RelationshipDescriptor,
    op: EditOp,
}

/// Keeps the inverse side of two-way relationships in step with writes.
///
/// Each target is patched with an independent read-modify-write under the
/// revision it was read at. Nothing is atomic across documents: a failed
/// patch is reported and the others stay applied.
#[derive(Clone)]
pub struct RelationshipSynchronizer {
    store: Arc<dyn DocumentStore>,
    schema: Arc<SchemaRegistry>,
}

impl RelationshipSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, schema: Arc<SchemaRegistry>) -> Self {
        Self { store, schema }
    }

    /// Propagate the relationship delta between `before` and `after` of the
    /// record `(record_type, record_id)` to the inverse documents.
    ///
    /// `before` is `None` for a create, `after` is `None` for a removal.
    /// Fields whose ids did not change cost nothing. Calling again with the
    /// same snapshots finds every target consistent and writes nothing.
    pub async fn synchronize(
        &self,
        record_id: &str,
        record_type: &str,
        before: Option<&Document>,
        after: Option<&Document>,
    ) -> SyncResult<SyncReport> {
        let record = KeyCodec::encode(record_type, record_id)?;
        let mut report = SyncReport::new(record.clone());

        let mut order: Vec<StorageKey> = Vec::new();
        let mut edits: HashMap<StorageKey, Vec<InverseEdit<'_>>> = HashMap::new();
        for desc in self.schema.relationships(record_type) {
            let Some(inverse) = self.schema.inverse_of(desc) else {
                continue;
            };
            let old = targets(desc, before)?;
            let new = targets(desc, after)?;
            if old == new {
                continue;
            }
            let removed = difference(&old, &new);
            let added = difference(&new, &old);
            debug!(
                %record,
                field = %desc.field_name,
                removed = removed.len(),
                added = added.len(),
                "relationship delta"
            );
            for (ids, op) in [(removed, EditOp::Strip), (added, EditOp::Attach)] {
                for id in ids {
                    let target = KeyCodec::encode(&desc.target_type, &id)?;
                    let entry = edits.entry(target.clone()).or_insert_with(|| {
                        order.push(target);
                        Vec::new()
                    });
                    entry.push(InverseEdit { inverse, op });
                }
            }
        }

        if order.is_empty() {
            report.state = SyncState::Synced;
            return Ok(report);
        }

        report.state = SyncState::Patching;
        let patches = order.into_iter().map(|target| {
            let target_edits = edits.remove(&target).unwrap_or_default();
            async move {
                let result = self.patch_target(&target, &target_edits, record_id).await;
                (target, result)
            }
        });
        for (target, result) in join_all(patches).await {
            match result {
                Ok(action) => report.outcomes.push(PatchOutcome { target, action }),
                Err(error) => {
                    warn!(%record, %target, %error, "inverse patch failed");
                    report.failed.push(FailedPatch { target, error });
                }
            }
        }

        report.state = if report.failed.is_empty() {
            SyncState::Synced
        } else {
            SyncState::PartiallyFailed
        };
        debug!(
            %record,
            state = ?report.state,
            patched = report.patched(),
            failed = report.failed.len(),
            "relationships synchronized"
        );
        Ok(report)
    }

    async fn patch_target(
        &self,
        target: &StorageKey,
        edits: &[InverseEdit<'_>],
        record_id: &str,
    ) -> StoreResult<PatchAction> {
        let Some(mut document) = self.store.get(target).await? else {
            debug!(%target, "inverse target missing, skipped");
            return Ok(PatchAction::TargetMissing);
        };

        let mut changed = false;
        for edit in edits {
            changed |= apply_edit(&mut document, edit, record_id)?;
        }
        if !changed {
            return Ok(PatchAction::AlreadyConsistent);
        }

        let revision = document
            .revision
            .clone()
            .ok_or_else(|| StoreError::conflict(target, "loaded document has no revision"))?;
        let next = self.store.put_update(&document, &revision).await?;
        debug!(%target, rev = %next, "inverse patched");
        Ok(PatchAction::Patched(next))
    }
}

impl std::fmt::Debug for RelationshipSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipSynchronizer")
            .field("types", &self.schema.types().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn targets(desc: &RelationshipDescriptor, snapshot: Option<&Document>) -> SyncResult<Vec<String>> {
    Ok(match snapshot {
        Some(doc) => desc.targets_of(doc)?,
        None => Vec::new(),
    })
}

/// Ids of `a` not in `b`, in `a` order, without repeats.
fn difference(a: &[String], b: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in a {
        if !b.contains(id) && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

/// Apply one edit in place. Returns whether the document changed.
fn apply_edit(document: &mut Document, edit: &InverseEdit<'_>, record_id: &str) -> StoreResult<bool> {
    let field = &edit.inverse.field_name;
    if let Some(current) = document.relation(field) {
        edit.inverse.check_shape(&document.doc_type, current)?;
    }
    let references = document
        .relation(field)
        .is_some_and(|v| v.references(record_id));

    match edit.op {
        EditOp::Strip if references => {
            let value = match edit.inverse.kind {
                RelationKind::BelongsTo => RelationValue::BelongsTo(None),
                RelationKind::HasMany => RelationValue::HasMany(
                    document
                        .related_ids(field)
                        .into_iter()
                        .filter(|id| id != record_id)
                        .collect(),
                ),
            };
            document.relationships.insert(field.clone(), value);
            Ok(true)
        }
        EditOp::Attach if !references => {
            let value = match edit.inverse.kind {
                RelationKind::BelongsTo => RelationValue::BelongsTo(Some(record_id.to_string())),
                RelationKind::HasMany => {
                    let mut ids = document.related_ids(field);
                    ids.push(record_id.to_string());
                    RelationValue::HasMany(ids)
                }
            };
            document.relationships.insert(field.clone(), value);
            Ok(true)
        }
        _ => Ok(false),
    }
}
