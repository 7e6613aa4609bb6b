//! Relationship schema.
//!
//! Descriptors are registered once per document type and frozen into a
//! [`SchemaRegistry`]. Nothing is discovered at runtime: the resolver and the
//! synchronizer only ever consult the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{Document, RelationValue};
use crate::error::ValidationError;
use crate::key::KeyCodec;

/// Cardinality of a relationship field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    BelongsTo,
    HasMany,
}

impl RelationKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongsTo",
            Self::HasMany => "hasMany",
        }
    }
}

/// Static metadata for one relationship field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub field_name: String,
    pub kind: RelationKind,
    pub target_type: String,
    /// Field on the target type that points back, if the relation is two-way.
    pub inverse_field: Option<String>,
    /// Lazy relations are handed out as deferred handles instead of being
    /// expanded during resolve.
    pub lazy: bool,
}

impl RelationshipDescriptor {
    pub fn belongs_to(field_name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            kind: RelationKind::BelongsTo,
            target_type: target_type.into(),
            inverse_field: None,
            lazy: false,
        }
    }

    pub fn has_many(field_name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            kind: RelationKind::HasMany,
            target_type: target_type.into(),
            inverse_field: None,
            lazy: false,
        }
    }

    pub fn inverse(mut self, field: impl Into<String>) -> Self {
        self.inverse_field = Some(field.into());
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// The ids `document` references through this field.
    ///
    /// Absent fields read as empty; a value whose shape disagrees with the
    /// declared kind is an error.
    pub fn targets_of(&self, document: &Document) -> Result<Vec<String>, ValidationError> {
        match document.relation(&self.field_name) {
            None => Ok(Vec::new()),
            Some(value) => {
                self.check_shape(&document.doc_type, value)?;
                Ok(value.normalize())
            }
        }
    }

    /// Verify that `value` has the shape this descriptor declares.
    pub fn check_shape(&self, doc_type: &str, value: &RelationValue) -> Result<(), ValidationError> {
        let matches = matches!(
            (self.kind, value),
            (RelationKind::BelongsTo, RelationValue::BelongsTo(_))
                | (RelationKind::HasMany, RelationValue::HasMany(_))
        );
        if matches {
            Ok(())
        } else {
            Err(ValidationError::RelationShape {
                doc_type: doc_type.to_string(),
                field: self.field_name.clone(),
                expected: self.kind.name(),
                found: value.kind_name(),
            })
        }
    }
}

/// Immutable table of relationship descriptors, keyed by document type.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, Vec<RelationshipDescriptor>>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Descriptors of `doc_type`; empty for unknown types.
    pub fn relationships(&self, doc_type: &str) -> &[RelationshipDescriptor] {
        self.types.get(doc_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn descriptor(&self, doc_type: &str, field: &str) -> Option<&RelationshipDescriptor> {
        self.relationships(doc_type)
            .iter()
            .find(|d| d.field_name == field)
    }

    /// The descriptor on the target side that `descriptor` names as inverse.
    pub fn inverse_of(&self, descriptor: &RelationshipDescriptor) -> Option<&RelationshipDescriptor> {
        let inverse = descriptor.inverse_field.as_deref()?;
        self.descriptor(&descriptor.target_type, inverse)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

/// Collects descriptors and validates them into a [`SchemaRegistry`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: BTreeMap<String, Vec<RelationshipDescriptor>>,
}

impl SchemaBuilder {
    /// Register a document type with its relationship fields.
    ///
    /// Registering the same type twice appends to its field list.
    pub fn register(
        mut self,
        doc_type: impl Into<String>,
        descriptors: impl IntoIterator<Item = RelationshipDescriptor>,
    ) -> Self {
        self.types
            .entry(doc_type.into())
            .or_default()
            .extend(descriptors);
        self
    }

    /// Validate and freeze the schema.
    ///
    /// Every target type must be registered, field names must be unique per
    /// type, and each declared inverse must exist on the target and point back
    /// at the owning type.
    pub fn build(self) -> Result<SchemaRegistry, ValidationError> {
        for (doc_type, descriptors) in &self.types {
            KeyCodec::validate_type(doc_type)?;
            for (i, d) in descriptors.iter().enumerate() {
                let invalid = |reason: String| ValidationError::InvalidSchema {
                    doc_type: doc_type.clone(),
                    field: d.field_name.clone(),
                    reason,
                };
                if d.field_name.is_empty() {
                    return Err(invalid("field name must not be empty".into()));
                }
                if descriptors[..i].iter().any(|o| o.field_name == d.field_name) {
                    return Err(invalid("field registered twice".into()));
                }
                let Some(target_fields) = self.types.get(&d.target_type) else {
                    return Err(invalid(format!(
                        "target type {:?} is not registered",
                        d.target_type
                    )));
                };
                if let Some(inverse) = &d.inverse_field {
                    let Some(back) = target_fields.iter().find(|t| &t.field_name == inverse)
                    else {
                        return Err(invalid(format!(
                            "inverse field {}.{inverse} does not exist",
                            d.target_type
                        )));
                    };
                    if &back.target_type != doc_type {
                        return Err(invalid(format!(
                            "inverse field {}.{inverse} targets {:?}, not {doc_type:?}",
                            d.target_type, back.target_type
                        )));
                    }
                }
            }
        }
        Ok(SchemaRegistry { types: self.types })
    }
}
