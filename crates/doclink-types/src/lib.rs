//! Foundation types for doclink.
//!
//! doclink persists an object graph into a schema-less document store that
//! offers whole-document reads and writes, per-document revision tokens, and
//! nothing else: no joins, no foreign keys, no multi-document transactions.
//! Every other doclink crate depends on `doclink-types`.
//!
//! # Key Types
//!
//! - [`StorageKey`] / [`KeyCodec`] -- `(type, id)` to sortable key encoding
//! - [`KeyRange`] -- half-open range over the primary key order
//! - [`Document`] -- a whole stored document with attributes and relationships
//! - [`RelationValue`] -- belongsTo / hasMany field values
//! - [`Revision`] -- opaque optimistic-concurrency token
//! - [`RelationshipDescriptor`] / [`SchemaRegistry`] -- static relationship schema

pub mod document;
pub mod error;
pub mod key;
pub mod schema;

pub use document::{Document, RelationValue, Revision};
pub use error::ValidationError;
pub use key::{KeyCodec, KeyRange, StorageKey, KEY_SEPARATOR};
pub use schema::{RelationKind, RelationshipDescriptor, SchemaBuilder, SchemaRegistry};
