//! HTTP contract of `GET /messages`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

use courier::core::{IngestConfig, Ingestor, Message};
use courier::queue::{MemoryQueue, MessageQueue};
use courier::store::{ConversationFilter, MessageStore, SqliteStore, StoreError};
use courier::web::{create_app_router, AppState};

struct DownStore;

#[async_trait]
impl MessageStore for DownStore {
    async fn append(&self, _message: &Message) -> Result<(), StoreError> {
        Err(StoreError::Other("database is down".to_string()))
    }

    async fn conversation(&self, _filter: &ConversationFilter) -> Result<Vec<Message>, StoreError> {
        Err(StoreError::Other("database is down".to_string()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Err(StoreError::Other("database is down".to_string()))
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

/// Router over a store filled by running the ingestion loop.
async fn seeded_app(dir: &tempfile::TempDir, items: &[&str]) -> Router {
    let queue = Arc::new(MemoryQueue::new());
    let store = Arc::new(SqliteStore::open(dir.path().join("messages.db")).unwrap());
    let ingestor = Ingestor::new(queue.clone(), store.clone(), IngestConfig::default());

    for item in items {
        queue.push("incoming", item).await.unwrap();
        ingestor.step().await;
    }
    create_app_router(AppState::new(store))
}

#[tokio::test]
async fn returns_conversation_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = seeded_app(&dir, &["alice|bob|hello", "bob|alice|hi back", "carol|bob|psst"]).await;

    let (status, body) = get(app, "/messages?user=bob&peer=alice").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["from"], "alice");
    assert_eq!(list[0]["to"], "bob");
    assert_eq!(list[0]["content"], "hello");
    assert!(list[0]["timestamp"].is_string());
    assert_eq!(list[1]["from"], "bob");
    assert_eq!(list[1]["content"], "hi back");
}

#[tokio::test]
async fn without_peer_returns_everything_for_user() {
    let dir = tempfile::tempdir().unwrap();
    let app = seeded_app(&dir, &["alice|bob|1", "carol|bob|2", "alice|carol|3"]).await;

    let (status, body) = get(app, "/messages?user=bob").await;
    assert_eq!(status, StatusCode::OK);

    let messages: Vec<Message> = serde_json::from_slice(&body).unwrap();
    let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["1", "2"]);
}

#[tokio::test]
async fn empty_result_is_an_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let app = seeded_app(&dir, &[]).await;

    let (status, body) = get(app, "/messages?user=nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn missing_user_is_bad_request() {
    let app = create_app_router(AppState::new(Arc::new(DownStore)));

    for uri in ["/messages", "/messages?user=", "/messages?peer=bob"] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(String::from_utf8(body).unwrap(), "user param required");
    }
}

#[tokio::test]
async fn storage_failure_is_server_error_with_detail() {
    let app = create_app_router(AppState::new(Arc::new(DownStore)));

    let (status, body) = get(app, "/messages?user=alice&peer=bob").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(String::from_utf8(body).unwrap(), "database is down");
}

#[tokio::test]
async fn health_check() {
    let app = create_app_router(AppState::new(Arc::new(DownStore)));

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}
