use thiserror::Error;

/// Errors produced while validating keys, documents, and schemas.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid document type {doc_type:?}: {reason}")]
    InvalidType { doc_type: String, reason: String },

    #[error("invalid document id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("malformed storage key {key:?}: {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("invalid relationship schema for {doc_type}.{field}: {reason}")]
    InvalidSchema {
        doc_type: String,
        field: String,
        reason: String,
    },

    #[error("relationship {doc_type}.{field} holds a {found} value, schema declares {expected}")]
    RelationShape {
        doc_type: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}
