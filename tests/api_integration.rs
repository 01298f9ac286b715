//! HTTP-level integration tests
//!
//! Drives the full router (routes, extractors, error mapping, layers)
//! with `tower::ServiceExt::oneshot` against the in-memory store. No
//! listener or Redis is needed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

use ara_message_queue::config::Settings;
use ara_message_queue::queue::{ListStore, MemoryListStore, StoreError};
use ara_message_queue::server::{create_app, AppState};
use ara_message_queue::shutdown::Shutdown;

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.queue.poll_interval_ms = 20;
    settings
}

fn create_test_app(store: Arc<dyn ListStore>) -> (Router, Shutdown) {
    let shutdown = Shutdown::new();
    let state = AppState::with_store(test_settings(), store, shutdown.signal());
    (create_app(state), shutdown)
}

fn memory_app() -> Router {
    create_test_app(Arc::new(MemoryListStore::new())).0
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<Value>) {
    let response = assert_ok!(app.clone().oneshot(request).await);
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, body)
}

/// Store whose every operation fails.
struct BrokenStore;

#[async_trait]
impl ListStore for BrokenStore {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn push_tail(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused to 10.0.0.7:6379".to_string()))
    }

    async fn pop_head(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused to 10.0.0.7:6379".to_string()))
    }

    async fn len(&self, _key: &str) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused to 10.0.0.7:6379".to_string()))
    }
}

// ============================================================================
// Submit
// ============================================================================

#[tokio::test]
async fn test_submit_returns_created_message() {
    let app = memory_app();

    let (status, body) = send(&app, post_json("/api/orders", json!({"data": {"x": 1}}))).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"]["queueName"], "orders");
    assert_eq!(body["message"]["data"], json!({"x": 1}));
    assert!(body["message"]["id"].as_str().is_some());
    assert!(body["message"]["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_submit_rejects_invalid_queue_name() {
    let app = memory_app();

    let (status, body) = send(&app, post_json("/api/bad%20name!", json!({"data": {}}))).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("Invalid queue name"));
}

#[tokio::test]
async fn test_submit_rejects_overlong_queue_name() {
    let app = memory_app();
    let uri = format!("/api/{}", "q".repeat(65));

    let (status, _) = send(&app, post_json(&uri, json!({"data": {}}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_rejects_missing_or_non_object_data() {
    let app = memory_app();

    for body in [json!({}), json!({"data": 5}), json!({"data": [1]}), json!([])] {
        let (status, response) = send(&app, post_json("/api/orders", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", body);
        assert_eq!(response.unwrap()["code"], "VALIDATION_ERROR");
    }

    // Nothing was stored
    let (_, length) = send(&app, get("/api/orders/length")).await;
    assert_eq!(length.unwrap()["length"], 0);
}

#[tokio::test]
async fn test_submit_rejects_malformed_json() {
    let app = memory_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"data\": "))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["success"], false);
}

// ============================================================================
// Retrieve
// ============================================================================

#[tokio::test]
async fn test_submit_then_retrieve_same_message() {
    let app = memory_app();

    let (_, created) = send(&app, post_json("/api/orders", json!({"data": {"x": 1}}))).await;
    let created = created.unwrap();

    let (status, body) = send(&app, get("/api/orders?timeout=5000")).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], created["message"]);
}

#[tokio::test]
async fn test_retrieve_is_fifo_per_queue() {
    let app = memory_app();

    for n in 1..=3 {
        send(&app, post_json("/api/jobs", json!({"data": {"n": n}}))).await;
    }
    send(&app, post_json("/api/other", json!({"data": {"n": 99}}))).await;

    for n in 1..=3 {
        let (status, body) = send(&app, get("/api/jobs?timeout=0")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["message"]["data"]["n"], n);
    }

    let (status, _) = send(&app, get("/api/jobs?timeout=0")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, get("/api/other?timeout=0")).await;
    assert_eq!(body.unwrap()["message"]["data"]["n"], 99);
}

#[tokio::test]
async fn test_retrieve_empty_queue_waits_for_timeout() {
    let app = memory_app();

    let start = Instant::now();
    let (status, body) = send(&app, get("/api/empty?timeout=300")).await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_none());
    assert!(elapsed >= Duration::from_millis(300), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "returned after {:?}", elapsed);
}

#[tokio::test]
async fn test_retrieve_zero_timeout_is_immediate() {
    let app = memory_app();

    let start = Instant::now();
    let (status, _) = send(&app, get("/api/ghost?timeout=0")).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_retrieve_receives_message_submitted_while_waiting() {
    let app = memory_app();

    let waiter = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, get("/api/late?timeout=5000")).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    send(&app, post_json("/api/late", json!({"data": {"arrived": true}}))).await;

    let (status, body) = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("waiter did not finish")
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"]["data"]["arrived"], true);
}

#[tokio::test]
async fn test_retrieve_rejects_bad_timeout() {
    let app = memory_app();

    for uri in ["/api/orders?timeout=-1", "/api/orders?timeout=abc", "/api/orders?timeout=1.5"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", uri);
        assert_eq!(body.unwrap()["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_retrieve_rejects_invalid_queue_name() {
    let app = memory_app();

    let (status, body) = send(&app, get("/api/no.dots?timeout=0")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["success"], false);
}

#[tokio::test]
async fn test_shutdown_cancels_pending_retrieve() {
    let (app, shutdown) = create_test_app(Arc::new(MemoryListStore::new()));

    let waiter = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, get("/api/idle?timeout=30000")).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.trigger();

    let (status, body) = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("long poll was not cancelled")
        .unwrap();

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.unwrap()["code"], "SHUTTING_DOWN");
}

// ============================================================================
// Length
// ============================================================================

#[tokio::test]
async fn test_queue_length_tracks_submissions() {
    let app = memory_app();

    for _ in 0..2 {
        send(&app, post_json("/api/counted", json!({"data": {}}))).await;
    }

    let (status, body) = send(&app, get("/api/counted/length")).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queueName"], "counted");
    assert_eq!(body["length"], 2);
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn test_storage_failure_returns_generic_500() {
    let (app, _shutdown) = create_test_app(Arc::new(BrokenStore));

    let (status, body) = send(&app, post_json("/api/orders", json!({"data": {"x": 1}}))).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("10.0.0.7"));

    let (status, body) = send(&app, get("/api/orders?timeout=0")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.unwrap()["code"], "INTERNAL_ERROR");
}

// ============================================================================
// Health, stats, metrics
// ============================================================================

#[tokio::test]
async fn test_health_reports_ok() {
    let app = memory_app();

    let (status, body) = send(&app, get("/health")).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
    assert!(body["timestamp"].as_str().is_some());
    assert!(body.get("redis").is_none());
}

#[tokio::test]
async fn test_stats_count_operations() {
    let app = memory_app();

    send(&app, post_json("/api/s", json!({"data": {}}))).await;
    send(&app, get("/api/s?timeout=0")).await;
    send(&app, get("/api/s?timeout=0")).await;

    let (status, body) = send(&app, get("/stats")).await;
    let queue = &body.unwrap()["queue"];

    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["enqueued"], 1);
    assert_eq!(queue["dequeued"], 1);
    assert_eq!(queue["empty_results"], 1);
    assert_eq!(queue["active_long_polls"], 0);
}

#[tokio::test]
async fn test_stats_count_timed_out_long_poll_once() {
    let app = memory_app();

    let (status, _) = send(&app, get("/api/quiet?timeout=200")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, get("/stats")).await;
    assert_eq!(body.unwrap()["queue"]["empty_results"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_text() {
    let app = memory_app();
    send(&app, post_json("/api/m", json!({"data": {}}))).await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("ara_mq_messages_enqueued_total"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = memory_app();

    let response = app.clone().oneshot(get("/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
