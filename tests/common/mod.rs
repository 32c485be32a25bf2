//! Common test helpers for HTTP integration tests.
//!
//! Builds a router over an in-memory store with two known callers and wraps
//! the request/response plumbing every endpoint test needs.
//!
//! # Note
//!
//! `#![allow(dead_code)]` is needed because each integration test file is
//! compiled as its own crate and not every file uses every helper.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use task_tracker_api::api::{AppState, create_router};
use task_tracker_api::config::AppConfig;
use task_tracker_api::infrastructure::InMemoryTaskStore;

pub const ALICE_TOKEN: &str = "alpha-token";
pub const BOB_TOKEN: &str = "beta-token";

// =============================================================================
// App Creation Helpers
// =============================================================================

/// Creates a router over an empty in-memory store.
///
/// `ALICE_TOKEN` resolves to `alice` and `BOB_TOKEN` to `bob`.
pub fn create_test_app() -> Router {
    let config = AppConfig::builder()
        .auth_token(ALICE_TOKEN, "alice")
        .auth_token(BOB_TOKEN, "bob")
        .build()
        .unwrap();
    let store = Arc::new(InMemoryTaskStore::new());
    create_router(AppState::from_config(store, &config))
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Sends one request through `app` and returns the status and JSON body.
///
/// An empty body decodes to `Value::Null`.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send_request(app, request).await
}

/// Sends a pre-built request through `app`.
pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// =============================================================================
// Fixtures
// =============================================================================

/// A complete, valid creation body.
pub fn task_body(title: &str, priority: i64, status: &str) -> Value {
    json!({
        "title": title,
        "startTime": "2024-01-01T09:00:00Z",
        "endTime": "2024-01-01T11:30:00Z",
        "priority": priority,
        "status": status,
    })
}

/// Creates a task as `token` and returns its identifier.
pub async fn create_task(app: &Router, token: &str, body: Value) -> String {
    let (status, created) = send(
        app,
        "POST",
        "/api/tasks/create-task",
        Some(token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {created}");
    created["task_id"].as_str().unwrap().to_string()
}
