//! Typed equality predicates and their compiled index functions.

use std::collections::BTreeMap;

use doclink_store::{IndexFunction, IndexKey, IndexQuery};
use doclink_types::{Document, KeyCodec, RelationValue, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pseudo-field that matches a document's local id.
pub const ID_FIELD: &str = "id";

/// A conjunction of `field == value` clauses.
///
/// Fields are kept sorted, so two predicates with the same clauses compile to
/// the same composite key regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate {
    clauses: BTreeMap<String, Value>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a `field == value` clause.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Predicate {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            clauses: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A predicate compiled for one document type.
///
/// Acts as the index function of a single query: it emits
/// `[type, field1, value1, field2, value2, ...]` for each document of the
/// type that has every predicate field, and the query asks for exactly the
/// key built from the predicate's own values. Nothing is persisted; callers
/// that repeat a query can keep the compiled value and reuse it.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledPredicate {
    doc_type: String,
    fields: Vec<String>,
    query_key: IndexKey,
    name: String,
}

impl CompiledPredicate {
    pub fn compile(doc_type: &str, predicate: &Predicate) -> Result<Self, ValidationError> {
        KeyCodec::validate_type(doc_type)?;
        let mut query_key = Vec::with_capacity(1 + 2 * predicate.len());
        query_key.push(Value::String(doc_type.to_string()));
        let mut fields = Vec::with_capacity(predicate.len());
        for (field, value) in predicate.iter() {
            query_key.push(Value::String(field.to_string()));
            query_key.push(value.clone());
            fields.push(field.to_string());
        }
        let name = format!("{doc_type}[{}]", fields.join(","));
        Ok(Self {
            doc_type: doc_type.to_string(),
            fields,
            query_key,
            name,
        })
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// The composite key a matching document emits.
    pub fn query_key(&self) -> &IndexKey {
        &self.query_key
    }

    /// The exact-match query, bounded to the type's key range.
    pub fn index_query(&self) -> Result<IndexQuery, ValidationError> {
        Ok(IndexQuery::exact(self.query_key.clone()).within(KeyCodec::type_range(&self.doc_type)?))
    }
}

impl IndexFunction for CompiledPredicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, document: &Document) -> Option<IndexKey> {
        if document.doc_type != self.doc_type {
            return None;
        }
        let mut key = Vec::with_capacity(1 + 2 * self.fields.len());
        key.push(Value::String(document.doc_type.clone()));
        for field in &self.fields {
            key.push(Value::String(field.clone()));
            key.push(field_value(document, field)?);
        }
        Some(key)
    }
}

/// The comparable value of `field` on `document`, `None` when absent.
///
/// Lookup order: the `id` pseudo-field, then attributes, then belongsTo
/// relationships (compared by foreign id).
fn field_value(document: &Document, field: &str) -> Option<Value> {
    if field == ID_FIELD {
        return Some(Value::String(document.id.clone()));
    }
    if let Some(value) = document.attributes.get(field) {
        return Some(value.clone());
    }
    match document.relation(field)? {
        RelationValue::BelongsTo(Some(id)) => Some(Value::String(id.clone())),
        RelationValue::BelongsTo(None) => Some(Value::Null),
        RelationValue::HasMany(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiles_sorted_composite_key() {
        let p = Predicate::new().eq("name", "two").eq("b", true);
        let c = CompiledPredicate::compile("list", &p).unwrap();
        assert_eq!(
            c.query_key(),
            &vec![json!("list"), json!("b"), json!(true), json!("name"), json!("two")]
        );
        assert_eq!(c.name(), "list[b,name]");
    }

    #[test]
    fn emit_requires_every_field() {
        let c = CompiledPredicate::compile("list", &Predicate::new().eq("name", "one")).unwrap();
        let named = Document::new("list", "l1").with_attr("name", "one");
        let unnamed = Document::new("list", "l2");
        assert_eq!(c.emit(&named).as_ref(), Some(c.query_key()));
        assert!(c.emit(&unnamed).is_none());
    }

    #[test]
    fn emit_ignores_other_types() {
        let c = CompiledPredicate::compile("list", &Predicate::new()).unwrap();
        assert!(c.emit(&Document::new("item", "i1")).is_none());
        assert_eq!(c.emit(&Document::new("list", "l1")), Some(vec![json!("list")]));
    }

    #[test]
    fn id_and_belongs_to_fields() {
        let item = Document::new("item", "i1").with_belongs_to("list", Some("l1"));
        let by_id = CompiledPredicate::compile("item", &Predicate::new().eq("id", "i1")).unwrap();
        assert_eq!(by_id.emit(&item).as_ref(), Some(by_id.query_key()));

        let by_list =
            CompiledPredicate::compile("item", &Predicate::new().eq("list", "l1")).unwrap();
        assert_eq!(by_list.emit(&item).as_ref(), Some(by_list.query_key()));
    }

    #[test]
    fn from_iterator_and_serde() {
        let p: Predicate = [("name", "two")].into_iter().collect();
        assert_eq!(serde_json::to_value(&p).unwrap(), json!({"name": "two"}));
        let back: Predicate = serde_json::from_value(json!({"name": "two"})).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn rejects_invalid_type() {
        assert!(CompiledPredicate::compile("a/b", &Predicate::new()).is_err());
    }
}
