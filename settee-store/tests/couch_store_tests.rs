mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use settee_store::{CouchConfig, CouchStore, DocumentStore, StoreError, ViewQuery};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> CouchConfig {
    CouchConfig {
        url: server.uri(),
        database: "test".to_string(),
        ..Default::default()
    }
}

fn mock_store(server: &MockServer) -> CouchStore {
    common::init_tracing();
    CouchStore::new(mock_config(server)).unwrap()
}

// ── Construction ────────────────────────────────────────────────

#[test]
fn couch_backend_name() {
    let store = CouchStore::new(CouchConfig::default()).unwrap();
    assert_eq!(store.backend_name(), "CouchDB");
}

#[test]
fn couch_from_url_keeps_database() {
    let store = CouchStore::from_url("http://127.0.0.1:5984/users").unwrap();
    assert_eq!(store.config().database, "users");
    assert_eq!(store.config().database_url(), "http://127.0.0.1:5984/users");
}

// ── insert ──────────────────────────────────────────────────────

#[tokio::test]
async fn insert_without_id_posts_to_database() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test"))
        .and(body_json(json!({"type": "user", "name": "sam"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true,
            "id": "6e1295ed6c29495e54cc05947f18c8af",
            "rev": "1-2902191555"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let meta = store.insert(&json!({"type": "user", "name": "sam"})).await.unwrap();

    assert_eq!(meta.id, "6e1295ed6c29495e54cc05947f18c8af");
    assert_eq!(meta.rev, "1-2902191555");
}

#[tokio::test]
async fn insert_with_id_puts_document() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/test/sam"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true,
            "id": "sam",
            "rev": "2-abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let meta = store
        .insert(&json!({"_id": "sam", "_rev": "1-xyz", "name": "sam"}))
        .await
        .unwrap();

    assert_eq!(meta.rev, "2-abc");
}

#[tokio::test]
async fn insert_percent_encodes_ids() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/test/a%2Fb"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true,
            "id": "a/b",
            "rev": "1-a"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let meta = store.insert(&json!({"_id": "a/b"})).await.unwrap();
    assert_eq!(meta.id, "a/b");
}

#[tokio::test]
async fn insert_conflict_maps_to_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/test/sam"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "conflict",
            "reason": "Document update conflict."
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let err = store
        .insert(&json!({"_id": "sam", "_rev": "42-5e3573660103a4b3819cd829d2f05a96"}))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(err.reason(), Some("Document update conflict."));
}

#[tokio::test]
async fn unauthorized_maps_to_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized",
            "reason": "You are not authorized to access this db."
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let err = store.insert(&json!({})).await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized { .. }));
}

#[tokio::test]
async fn server_error_maps_to_api() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "unknown_error",
            "reason": "badarg"
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let err = store.insert(&json!({})).await.unwrap_err();
    match err {
        StoreError::Api { status, error, reason } => {
            assert_eq!(status, 500);
            assert_eq!(error, "unknown_error");
            assert_eq!(reason, "badarg");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_becomes_reason() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test/x"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let err = store.get("x").await.unwrap_err();
    assert_eq!(err.reason(), Some("bad gateway"));
}

#[tokio::test]
async fn basic_auth_is_sent_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test/sam"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "sam",
            "_rev": "1-a"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = CouchConfig {
        username: Some("user".to_string()),
        password: Some("pass".to_string()),
        ..mock_config(&server)
    };
    let store = CouchStore::new(config).unwrap();
    let doc = store.get("sam").await.unwrap();
    assert_eq!(doc["_rev"], "1-a");
}

// ── destroy ─────────────────────────────────────────────────────

#[tokio::test]
async fn destroy_sends_rev_as_query() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/test/sam"))
        .and(query_param("rev", "1-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "id": "sam",
            "rev": "2-b"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let meta = store.destroy("sam", "1-a").await.unwrap();
    assert_eq!(meta.rev, "2-b");
}

// ── get ─────────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_document() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test/nonexistent-id"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "missing"
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let err = store.get("nonexistent-id").await.unwrap_err();
    assert!(err.is_missing());
}

#[tokio::test]
async fn get_deleted_document() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "deleted"
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let err = store.get("gone").await.unwrap_err();
    assert!(err.is_deleted());
}

// ── view ────────────────────────────────────────────────────────

#[tokio::test]
async fn view_encodes_key_as_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test/_design/message/_view/findByContent"))
        .and(query_param("key", "\"hello\""))
        .and(query_param("include_docs", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "m1", "key": "hello", "value": {"content": "hello"}, "doc": {"_id": "m1"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let response = store
        .view(
            "message",
            "findByContent",
            &ViewQuery::new().key("hello").include_docs(true),
        )
        .await
        .unwrap();

    assert_eq!(response.total_rows, Some(2));
    assert_eq!(response.rows.len(), 1);
    assert_eq!(response.rows[0].id.as_deref(), Some("m1"));
    assert_eq!(response.rows[0].doc, Some(json!({"_id": "m1"})));
}

#[tokio::test]
async fn view_missing_named_view() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test/_design/message/_view/findByNothing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "missing_named_view"
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let err = store
        .view("message", "findByNothing", &ViewQuery::new())
        .await
        .unwrap_err();
    assert_eq!(err.reason(), Some("missing_named_view"));
}

// ── helpers ─────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_database_tolerates_existing_database() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "error": "file_exists",
            "reason": "The database could not be created, the file already exists."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = mock_store(&server);
    store.ensure_database().await.unwrap();
}

#[tokio::test]
async fn put_design_reuses_current_rev() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test/_design/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "_design/message",
            "_rev": "3-old",
            "views": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/test/_design/message"))
        .and(body_json(json!({
            "_id": "_design/message",
            "views": {"findByContent": {"map": "function (doc) {}"}},
            "_rev": "3-old"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true,
            "id": "_design/message",
            "rev": "4-new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = mock_store(&server);
    let meta = store
        .put_design(&json!({
            "_id": "_design/message",
            "views": {"findByContent": {"map": "function (doc) {}"}}
        }))
        .await
        .unwrap();
    assert_eq!(meta.rev, "4-new");
}

#[tokio::test]
async fn put_design_requires_design_id() {
    let server = MockServer::start().await;
    let store = mock_store(&server);

    let err = store.put_design(&json!({"_id": "plain"})).await.unwrap_err();
    assert!(matches!(err, StoreError::BadRequest { .. }));
}
