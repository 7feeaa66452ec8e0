//! Entry point binding the factories to one store.

use crate::collection::Collection;
use crate::error::ModelResult;
use crate::model::Model;
use serde_json::Value;
use settee_store::{CouchConfig, CouchStore, DocumentStore};
use std::sync::Arc;

/// A store handle shared by every model and collection made from it.
#[derive(Clone)]
pub struct Connection {
    store: Arc<dyn DocumentStore>,
}

impl Connection {
    /// Connects to the CouchDB database at `database_url`
    /// (e.g. `http://127.0.0.1:5984/test`).
    ///
    /// No request is made until a record or collection is used.
    pub fn open(database_url: &str) -> ModelResult<Self> {
        Self::from_config(CouchConfig::from_url(database_url)?)
    }

    pub fn from_config(config: CouchConfig) -> ModelResult<Self> {
        Ok(Self::with_store(Arc::new(CouchStore::new(config)?)))
    }

    /// Uses an existing store, e.g. a `MemoryStore`.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// `Model::extend` against this connection's store.
    pub fn model(&self, definition: &Value) -> ModelResult<Model> {
        Model::extend(Arc::clone(&self.store), definition)
    }

    /// `Collection::extend` against this connection's store.
    pub fn collection(&self, definition: &Value) -> ModelResult<Collection> {
        Collection::extend(Arc::clone(&self.store), definition)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("store", &self.store.backend_name())
            .finish()
    }
}
