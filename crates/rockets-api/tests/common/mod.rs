//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rockets_messaging::in_memory::InMemoryDeduplicator;
use rockets_rocket::domain::aggregates::GuardPolicy;
use rockets_rocket::infrastructure::in_memory_repository::InMemoryRocketRepository;
use rockets_sync::in_memory::InMemoryLockStore;
use rockets_sync::{LockStore, MutexOptions};
use serde_json::{Value, json};
use tower::ServiceExt;

use rockets_api::build_router;
use rockets_api::config::AppConfig;
use rockets_api::state::AppState;

/// Rocket id used across integration tests.
pub const ROCKET_ID: &str = "193270a9-c9cf-404a-8f83-838e71d9ae67";

/// Configuration with a fast-failing mutex and the given guard.
pub fn test_config(guard: GuardPolicy) -> AppConfig {
    AppConfig {
        mutex: MutexOptions {
            retries: 2,
            retry_delay: Duration::from_millis(5),
            ..MutexOptions::default()
        },
        guard,
        ..AppConfig::default()
    }
}

/// Build the full app router over in-memory stores. Uses the same route
/// structure as `main.rs`.
pub fn build_test_app(guard: GuardPolicy) -> Router {
    build_test_app_with_lock_store(guard, Arc::new(InMemoryLockStore::new()))
}

/// Build the full app router over a custom lock store.
pub fn build_test_app_with_lock_store(guard: GuardPolicy, lock_store: Arc<dyn LockStore>) -> Router {
    let state = AppState::new(
        Arc::new(InMemoryRocketRepository::new()),
        lock_store,
        Arc::new(InMemoryDeduplicator::new()),
        &test_config(guard),
    );
    build_router(state)
}

/// Wire envelope for `message_type` on [`ROCKET_ID`].
pub fn envelope(message_type: &str, number: u64, time: &str, message: &Value) -> Value {
    json!({
        "metadata": {
            "channel": ROCKET_ID,
            "messageNumber": number,
            "messageTime": time,
            "messageType": message_type
        },
        "message": message
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a raw body and return the response.
pub async fn post_bytes(app: Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    send(app, request).await
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_bytes(app, uri, serde_json::to_vec(body).unwrap()).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
