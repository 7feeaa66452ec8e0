//! CouchDB store implementation.
//!
//! Talks to the CouchDB HTTP API with reqwest.

use crate::config::CouchConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentMeta, DocumentStore, ViewQuery, ViewResponse};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const DESIGN_PREFIX: &str = "_design/";

/// CouchDB error body (`{"error": "conflict", "reason": "Document update conflict."}`).
#[derive(Debug, Default, Deserialize)]
struct CouchErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

/// CouchDB-backed document store.
pub struct CouchStore {
    config: CouchConfig,
    client: Client,
}

impl CouchStore {
    /// Creates a new CouchDB store for the configured database.
    pub fn new(config: CouchConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Shorthand for `CouchStore::new(CouchConfig::from_url(url)?)`.
    pub fn from_url(database_url: &str) -> StoreResult<Self> {
        Self::new(CouchConfig::from_url(database_url)?)
    }

    pub fn config(&self) -> &CouchConfig {
        &self.config
    }

    /// URL of a document; design document ids keep their literal prefix.
    fn doc_url(&self, id: &str) -> String {
        let encoded = match id.strip_prefix(DESIGN_PREFIX) {
            Some(name) => format!("{DESIGN_PREFIX}{}", urlencoding::encode(name)),
            None => urlencoding::encode(id).into_owned(),
        };
        format!("{}/{}", self.config.database_url(), encoded)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    /// Creates the database if it doesn't exist.
    pub async fn ensure_database(&self) -> StoreResult<()> {
        let response = self
            .authorize(self.client.put(self.config.database_url()))
            .send()
            .await?;

        // 412 means the database already exists
        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(());
        }
        check(response).await?;
        info!("Created CouchDB database: {}", self.config.database);
        Ok(())
    }

    /// Creates or replaces a design document, fetching its current revision
    /// first so repeated installs don't conflict.
    pub async fn put_design(&self, design: &Value) -> StoreResult<DocumentMeta> {
        let id = design
            .get("_id")
            .and_then(Value::as_str)
            .filter(|id| id.starts_with(DESIGN_PREFIX))
            .ok_or_else(|| StoreError::BadRequest {
                reason: "design document needs a _design/ id".to_string(),
            })?;

        let mut design = design.clone();
        match self.get(id).await {
            Ok(current) => {
                if let (Some(rev), Some(obj)) = (current.get("_rev").cloned(), design.as_object_mut()) {
                    obj.insert("_rev".to_string(), rev);
                }
            }
            Err(e) if e.is_missing() || e.is_deleted() => {}
            Err(e) => return Err(e),
        }

        let meta = self.insert(&design).await?;
        info!("Installed design document {} at {}", meta.id, meta.rev);
        Ok(meta)
    }
}

/// Turns a non-success response into the matching `StoreError`.
async fn check(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: CouchErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let reason = if body.reason.is_empty() { text } else { body.reason };

    Err(match status {
        StatusCode::NOT_FOUND => StoreError::NotFound { reason },
        StatusCode::CONFLICT => StoreError::Conflict { reason },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized { reason },
        StatusCode::BAD_REQUEST => StoreError::BadRequest { reason },
        _ => StoreError::Api {
            status: status.as_u16(),
            error: body.error,
            reason,
        },
    })
}

#[async_trait]
impl DocumentStore for CouchStore {
    fn backend_name(&self) -> &'static str {
        "CouchDB"
    }

    async fn insert(&self, doc: &Value) -> StoreResult<DocumentMeta> {
        let request = match doc.get("_id").and_then(Value::as_str) {
            Some(id) => {
                debug!("PUT document {} (rev {:?})", id, doc.get("_rev"));
                self.client.put(self.doc_url(id))
            }
            None => {
                debug!("POST new document to {}", self.config.database);
                self.client.post(self.config.database_url())
            }
        };

        let response = check(self.authorize(request).json(doc).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn destroy(&self, id: &str, rev: &str) -> StoreResult<DocumentMeta> {
        debug!("DELETE document {} at rev {}", id, rev);

        let request = self
            .client
            .delete(self.doc_url(id))
            .query(&[("rev", rev)]);
        let response = check(self.authorize(request).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn get(&self, id: &str) -> StoreResult<Value> {
        debug!("GET document {}", id);

        let response = check(self.authorize(self.client.get(self.doc_url(id))).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn view(&self, design: &str, view: &str, query: &ViewQuery) -> StoreResult<ViewResponse> {
        debug!("GET view {}/{} {:?}", design, view, query);

        let url = format!(
            "{}/{}{}/_view/{}",
            self.config.database_url(),
            DESIGN_PREFIX,
            urlencoding::encode(design),
            urlencoding::encode(view)
        );
        let request = self.client.get(url).query(&query.to_query_pairs());
        let response = check(self.authorize(request).send().await?).await?;
        Ok(response.json().await?)
    }
}
