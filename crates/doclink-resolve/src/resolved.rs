use std::collections::BTreeMap;

use doclink_query::RangeQueryPlanner;
use doclink_types::Document;

use crate::error::ResolveResult;

/// A document plus the related documents loaded for it.
///
/// Related documents live in a side channel keyed by relationship field; the
/// document's own relationship fields still hold only ids. Missing targets
/// are simply absent from `related`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedDocument {
    pub document: Document,
    pub related: BTreeMap<String, Vec<ResolvedDocument>>,
    pub deferred: BTreeMap<String, DeferredRelation>,
}

impl ResolvedDocument {
    /// A document with nothing resolved.
    pub fn leaf(document: Document) -> Self {
        Self {
            document,
            related: BTreeMap::new(),
            deferred: BTreeMap::new(),
        }
    }

    /// Expanded documents for `field`, in field order.
    pub fn related(&self, field: &str) -> &[ResolvedDocument] {
        self.related.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Local ids of the expanded documents for `field`.
    pub fn related_ids(&self, field: &str) -> Vec<&str> {
        self.related(field)
            .iter()
            .map(|r| r.document.id.as_str())
            .collect()
    }

    pub fn deferred(&self, field: &str) -> Option<&DeferredRelation> {
        self.deferred.get(field)
    }
}

impl From<Document> for ResolvedDocument {
    fn from(document: Document) -> Self {
        Self::leaf(document)
    }
}

/// Handle to a lazy relationship.
///
/// `load` performs the batched fetch every time it is called; nothing is
/// cached on the handle.
#[derive(Clone, Debug)]
pub struct DeferredRelation {
    planner: RangeQueryPlanner,
    target_type: String,
    ids: Vec<String>,
}

impl DeferredRelation {
    pub(crate) fn new(planner: RangeQueryPlanner, target_type: String, ids: Vec<String>) -> Self {
        Self {
            planner,
            target_type,
            ids,
        }
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Fetch the referenced documents. Missing ones are omitted.
    pub async fn load(&self) -> ResolveResult<Vec<Document>> {
        if self.ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.planner.get_by_keys(&self.target_type, &self.ids).await?)
    }
}

impl PartialEq for DeferredRelation {
    fn eq(&self, other: &Self) -> bool {
        self.target_type == other.target_type && self.ids == other.ids
    }
}
