//! Document store collaborators for settee.
//!
//! The model layer only ever talks to a [`DocumentStore`]: four calls keyed by
//! document id and revision. Two implementations are provided:
//!
//! - [`CouchStore`] speaks the CouchDB HTTP API
//! - [`MemoryStore`] keeps documents in process with the same revision rules
//!
//! # Example
//!
//! ```
//! use settee_store::{DocumentStore, MemoryStore};
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let store = MemoryStore::new();
//! let meta = store.insert(&json!({"type": "user", "name": "sam"})).await.unwrap();
//! assert!(meta.rev.starts_with("1-"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod config;
mod couch;
mod error;
mod memory;
mod store;

pub use config::{CouchConfig, ENV_PASSWORD, ENV_URL, ENV_USER};
pub use couch::CouchStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{DocumentMeta, DocumentStore, ViewQuery, ViewResponse, ViewRow};
