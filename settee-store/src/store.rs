//! Document store abstraction trait.
//!
//! Defines the four calls the model layer makes against a CouchDB-style
//! store. Documents travel as JSON objects carrying their own `_id`/`_rev`.

use crate::error::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a stored document revision, as returned by writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// The document id.
    pub id: String,
    /// The revision produced by the write.
    pub rev: String,
}

/// A single row of a view result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    /// Id of the emitting document. Absent on reduced rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: Value,
    pub value: Value,
    /// The full document when the query asked for `include_docs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

/// The body of a view response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default)]
    pub rows: Vec<ViewRow>,
}

/// Query parameters for a view lookup.
///
/// Keys are JSON values; they are JSON-encoded on the wire as CouchDB
/// expects (`?key="abc"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(default)]
    pub descending: bool,
    #[serde(default)]
    pub include_docs: bool,
}

impl ViewQuery {
    /// An unrestricted query returning every row of the view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to rows whose key equals `key`.
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Restricts the query to rows whose key is one of `keys`.
    pub fn keys<I, V>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn start_key(mut self, key: impl Into<Value>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    pub fn end_key(mut self, key: impl Into<Value>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn include_docs(mut self, include_docs: bool) -> Self {
        self.include_docs = include_docs;
        self
    }

    /// Renders the query as URL query pairs in CouchDB's parameter names.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(key) = &self.key {
            pairs.push(("key", key.to_string()));
        }
        if let Some(keys) = &self.keys {
            pairs.push(("keys", Value::Array(keys.clone()).to_string()));
        }
        if let Some(start) = &self.start_key {
            pairs.push(("startkey", start.to_string()));
        }
        if let Some(end) = &self.end_key {
            pairs.push(("endkey", end.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        if self.descending {
            pairs.push(("descending", "true".to_string()));
        }
        if self.include_docs {
            pairs.push(("include_docs", "true".to_string()));
        }
        pairs
    }
}

/// Abstract document store interface.
///
/// Every call is a single round trip. Implementations report failures with
/// CouchDB semantics: stale or absent revisions are conflicts, unknown ids are
/// `missing`, tombstoned ids are `deleted`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the name of the backend, for logging.
    fn backend_name(&self) -> &'static str;

    /// Creates or updates a document.
    ///
    /// A document without `_id` is created under a store-generated id. A
    /// document with `_id` must carry the current `_rev` unless the id is new.
    async fn insert(&self, doc: &Value) -> StoreResult<DocumentMeta>;

    /// Deletes the revision `rev` of document `id`, returning the tombstone
    /// revision.
    async fn destroy(&self, id: &str, rev: &str) -> StoreResult<DocumentMeta>;

    /// Fetches the current revision of a document.
    async fn get(&self, id: &str) -> StoreResult<Value>;

    /// Queries the view `view` of design document `_design/{design}`.
    async fn view(&self, design: &str, view: &str, query: &ViewQuery) -> StoreResult<ViewResponse>;
}
