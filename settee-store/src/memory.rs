//! In-memory document store.
//!
//! Follows CouchDB's revision rules closely enough to stand in for a server in
//! tests and embedded use: `N-<hash>` revisions, conflicts on stale or
//! unexpected revisions, tombstones on delete and single-field views.

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentMeta, DocumentStore, ViewQuery, ViewResponse, ViewRow};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Current state of one document id.
#[derive(Debug, Clone)]
struct StoredDoc {
    seq: u64,
    rev: String,
    body: Value,
    deleted: bool,
}

/// In-memory store with CouchDB revision semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, StoredDoc>>,
    /// design name -> view name -> emitted field
    views: RwLock<HashMap<String, HashMap<String, String>>>,
    requests: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers view `view` under design `design`.
    ///
    /// The view emits `doc[field]` as key and the document as value for every
    /// live document whose `type` equals `design` and that carries `field`.
    pub async fn define_view(&self, design: &str, view: &str, field: &str) {
        self.views
            .write()
            .await
            .entry(design.to_string())
            .or_default()
            .insert(view.to_string(), field.to_string());
    }

    /// Number of live (non-deleted) documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.values().filter(|d| !d.deleted).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of store calls served so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(AtomicOrdering::Relaxed)
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Builds revision `seq` of a document from its body and previous revision.
fn next_rev(seq: u64, previous: Option<&str>, body: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.unwrap_or_default().as_bytes());
    hasher.update(body.to_string().as_bytes());
    let digest = hasher.finalize();
    format!("{}-{}", seq, hex::encode(&digest[..16]))
}

fn string_field<'a>(obj: &'a Map<String, Value>, name: &str) -> StoreResult<Option<&'a str>> {
    match obj.get(name) {
        None => Ok(None),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.as_str())),
        Some(other) => Err(StoreError::BadRequest {
            reason: format!("invalid {name}: {other}"),
        }),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Orders view keys the way CouchDB collates JSON: null, booleans, numbers,
/// strings, arrays, objects.
fn collate(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| collate(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y)
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| collate(lv, rv)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn in_range(key: &Value, query: &ViewQuery) -> bool {
    let (low, high) = if query.descending {
        (query.end_key.as_ref(), query.start_key.as_ref())
    } else {
        (query.start_key.as_ref(), query.end_key.as_ref())
    };
    low.is_none_or(|low| collate(key, low).is_ge()) && high.is_none_or(|high| collate(key, high).is_le())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, doc: &Value) -> StoreResult<DocumentMeta> {
        self.record_request();

        let obj = doc.as_object().ok_or_else(|| StoreError::BadRequest {
            reason: "Document must be a JSON object".to_string(),
        })?;
        let presented = string_field(obj, "_rev")?;
        let id = match string_field(obj, "_id")? {
            Some(id) => id.to_string(),
            None => generate_id(),
        };

        let mut docs = self.docs.write().await;
        let current = docs.get(&id);
        match (current, presented) {
            // A revision for an id the store has never seen
            (None, Some(_)) => return Err(StoreError::conflict()),
            // Live documents always need their current revision
            (Some(stored), rev) if !stored.deleted && rev != Some(stored.rev.as_str()) => {
                return Err(StoreError::conflict());
            }
            // Tombstones may be recreated blind, or from the tombstone revision
            (Some(stored), Some(rev)) if stored.deleted && rev != stored.rev => {
                return Err(StoreError::conflict());
            }
            _ => {}
        }

        let seq = current.map_or(0, |stored| stored.seq) + 1;
        let mut body = obj.clone();
        body.remove("_rev");
        body.insert("_id".to_string(), Value::String(id.clone()));
        let rev = next_rev(seq, current.map(|stored| stored.rev.as_str()), &Value::Object(body.clone()));
        body.insert("_rev".to_string(), Value::String(rev.clone()));

        debug!("memory insert {} -> {}", id, rev);
        docs.insert(
            id.clone(),
            StoredDoc {
                seq,
                rev: rev.clone(),
                body: Value::Object(body),
                deleted: false,
            },
        );

        Ok(DocumentMeta { id, rev })
    }

    async fn destroy(&self, id: &str, rev: &str) -> StoreResult<DocumentMeta> {
        self.record_request();

        let mut docs = self.docs.write().await;
        let stored = docs.get_mut(id).ok_or_else(StoreError::missing)?;
        if stored.deleted {
            return Err(StoreError::deleted());
        }
        if stored.rev != rev {
            return Err(StoreError::conflict());
        }

        stored.seq += 1;
        let mut tombstone = Map::new();
        tombstone.insert("_id".to_string(), Value::String(id.to_string()));
        tombstone.insert("_deleted".to_string(), Value::Bool(true));
        let new_rev = next_rev(stored.seq, Some(stored.rev.as_str()), &Value::Object(tombstone.clone()));
        tombstone.insert("_rev".to_string(), Value::String(new_rev.clone()));

        debug!("memory destroy {} -> {}", id, new_rev);
        stored.rev = new_rev.clone();
        stored.body = Value::Object(tombstone);
        stored.deleted = true;

        Ok(DocumentMeta {
            id: id.to_string(),
            rev: new_rev,
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Value> {
        self.record_request();

        let docs = self.docs.read().await;
        match docs.get(id) {
            None => Err(StoreError::missing()),
            Some(stored) if stored.deleted => Err(StoreError::deleted()),
            Some(stored) => Ok(stored.body.clone()),
        }
    }

    async fn view(&self, design: &str, view: &str, query: &ViewQuery) -> StoreResult<ViewResponse> {
        self.record_request();

        let field = {
            let views = self.views.read().await;
            let design_views = views.get(design).ok_or_else(StoreError::missing)?;
            design_views
                .get(view)
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    reason: "missing_named_view".to_string(),
                })?
        };

        let docs = self.docs.read().await;
        let mut emitted: Vec<ViewRow> = docs
            .iter()
            .filter(|(_, stored)| !stored.deleted)
            .filter(|(_, stored)| stored.body.get("type").and_then(Value::as_str) == Some(design))
            .filter_map(|(id, stored)| {
                let key = stored.body.get(&field)?.clone();
                Some(ViewRow {
                    id: Some(id.clone()),
                    key,
                    value: stored.body.clone(),
                    doc: None,
                })
            })
            .collect();
        emitted.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));
        if query.descending {
            emitted.reverse();
        }
        let total_rows = emitted.len() as u64;

        let all = &emitted;
        let selected: Vec<(usize, ViewRow)> = match (&query.keys, &query.key) {
            (Some(keys), _) => keys
                .iter()
                .flat_map(move |wanted| {
                    all.iter()
                        .enumerate()
                        .filter(move |(_, row)| collate(&row.key, wanted).is_eq())
                })
                .map(|(i, row)| (i, row.clone()))
                .collect(),
            (None, Some(key)) => emitted
                .iter()
                .enumerate()
                .filter(|(_, row)| collate(&row.key, key).is_eq())
                .map(|(i, row)| (i, row.clone()))
                .collect(),
            (None, None) => emitted
                .iter()
                .enumerate()
                .filter(|(_, row)| in_range(&row.key, query))
                .map(|(i, row)| (i, row.clone()))
                .collect(),
        };

        let skip = query.skip.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let page: Vec<(usize, ViewRow)> = selected.into_iter().skip(skip).take(limit).collect();
        let offset = page.first().map_or(total_rows, |(i, _)| *i as u64);

        let rows = page
            .into_iter()
            .map(|(_, mut row)| {
                if query.include_docs {
                    row.doc = Some(row.value.clone());
                }
                row
            })
            .collect();

        Ok(ViewResponse {
            total_rows: Some(total_rows),
            offset: Some(offset),
            rows,
        })
    }
}
