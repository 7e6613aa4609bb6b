//! Documents, relationship values, and revision tokens.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::key::{KeyCodec, StorageKey};

/// Opaque revision token returned by every successful write.
///
/// Callers never interpret it; they hand the last one they saw back to the
/// store on the next update or removal.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

/// The stored value of one relationship field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationValue {
    /// Many-side of a one-to-many: an ordered list of foreign ids.
    HasMany(Vec<String>),
    /// One-side: a single foreign id, or `null`.
    BelongsTo(Option<String>),
}

impl RelationValue {
    /// The referenced ids as an ordered sequence; `BelongsTo(None)` is empty.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            Self::HasMany(ids) => ids.clone(),
            Self::BelongsTo(id) => id.iter().cloned().collect(),
        }
    }

    /// Returns `true` if the field references `id`.
    pub fn references(&self, id: &str) -> bool {
        match self {
            Self::HasMany(ids) => ids.iter().any(|i| i == id),
            Self::BelongsTo(current) => current.as_deref() == Some(id),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::HasMany(_) => "hasMany",
            Self::BelongsTo(_) => "belongsTo",
        }
    }
}

/// A whole document as fetched from and written to the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub id: String,
    /// `None` until the document has been written once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationValue>,
}

impl Document {
    /// A new, never-written document with no attributes or relationships.
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: id.into(),
            revision: None,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style belongsTo setter.
    pub fn with_belongs_to(mut self, field: impl Into<String>, id: Option<&str>) -> Self {
        self.relationships.insert(
            field.into(),
            RelationValue::BelongsTo(id.map(str::to_string)),
        );
        self
    }

    /// Builder-style hasMany setter.
    pub fn with_has_many<I, S>(mut self, field: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.insert(
            field.into(),
            RelationValue::HasMany(ids.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// The storage key of this document.
    pub fn key(&self) -> Result<StorageKey, ValidationError> {
        KeyCodec::encode(&self.doc_type, &self.id)
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn relation(&self, field: &str) -> Option<&RelationValue> {
        self.relationships.get(field)
    }

    /// Ids referenced by `field`, empty when the field is absent.
    pub fn related_ids(&self, field: &str) -> Vec<String> {
        self.relation(field)
            .map(RelationValue::normalize)
            .unwrap_or_default()
    }
}
