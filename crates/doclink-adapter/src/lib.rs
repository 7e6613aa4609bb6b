//! doclink: a relationship-consistent adapter over a revisioned document store.
//!
//! Documents are fetched and written whole, one key each, and every write
//! carries the revision it was based on. The store knows nothing about
//! relationships. This crate keeps them usable anyway:
//!
//! - reads expand related documents with batched point lookups instead of joins
//! - writes patch the inverse side of every two-way relationship that changed
//!
//! [`DocumentAdapter`] is the entry point.
//!
//! ```no_run
//! use doclink_adapter::{
//!     AdapterConfig, Document, DocumentAdapter, FindOptions, RelationshipDescriptor,
//!     SchemaRegistry,
//! };
//!
//! # async fn demo() -> doclink_adapter::AdapterResult<()> {
//! let schema = SchemaRegistry::builder()
//!     .register("list", vec![RelationshipDescriptor::has_many("items", "item").inverse("list")])
//!     .register("item", vec![RelationshipDescriptor::belongs_to("list", "list").inverse("items")])
//!     .build()?;
//! let adapter = DocumentAdapter::in_memory(schema, AdapterConfig::default());
//!
//! let item = Document::new("item", adapter.generate_id());
//! adapter.write(&item.id, "item", None, &item).await?;
//! let list = Document::new("list", "l1").with_has_many("items", [item.id.clone()]);
//! adapter.write("l1", "list", None, &list).await?;
//!
//! let found = adapter.find_one("list", "l1", FindOptions::expanded()).await?;
//! assert_eq!(found.related("items").len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod options;

pub use adapter::DocumentAdapter;
pub use config::{AdapterConfig, DEFAULT_DATABASE_NAME};
pub use error::{AdapterError, AdapterResult};
pub use options::{FindOptions, RemoveOutcome, WriteOutcome};

// Re-export key types
pub use doclink_query::{Predicate, RangeQueryPlanner};
pub use doclink_resolve::{DeferredRelation, ResolvedDocument};
pub use doclink_store::{DocumentStore, InMemoryDocumentStore, ReadCountingStore, StoreError};
pub use doclink_sync::{FailedPatch, PatchAction, SyncError, SyncReport, SyncState};
pub use doclink_types::{
    Document, KeyCodec, RelationKind, RelationValue, RelationshipDescriptor, Revision,
    SchemaRegistry, StorageKey,
};
