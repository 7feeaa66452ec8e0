//! Schema-driven document models for CouchDB-style stores.
//!
//! - [`Schema`]: validated field declarations with per-field view flags
//! - [`Model`]: the record constructor for a schema (`Model::extend`)
//! - [`Record`]: a whitelisted document with `save` and `delete`
//! - [`Collection`]: `get` by id plus generated `findBy<Field>` view lookups
//! - [`Connection`]: binds the factories to one shared store
//!
//! Writes use optimistic concurrency: a record presents the `_rev` it last
//! saw, and the store rejects stale revisions as conflicts.
//!
//! # Example
//!
//! ```
//! use settee_model::Connection;
//! use settee_store::MemoryStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let db = Connection::with_store(Arc::new(MemoryStore::new()));
//! let users = db.model(&json!({"type": "user", "properties": ["name", "email"]})).unwrap();
//!
//! let mut sam = users.create(&json!({"name": "sam", "admin": true}));
//! assert!(!sam.has_field("admin"));
//!
//! sam.save().await.unwrap();
//! assert!(sam.id().is_some());
//! # });
//! ```

mod collection;
mod connection;
mod error;
mod model;
mod record;
mod schema;

pub use collection::{Collection, FINDER_PREFIX, ViewFinder, finder_name};
pub use connection::Connection;
pub use error::{ModelError, ModelResult};
pub use model::Model;
pub use record::Record;
pub use schema::{FieldSpec, RESERVED_FIELDS, Schema, SchemaBuilder};

pub use settee_store::{DocumentStore, StoreError, ViewQuery, ViewRow};
