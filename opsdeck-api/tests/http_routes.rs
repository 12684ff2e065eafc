//! Route-level tests driving the router in-process
//!
//! Run with: cargo test -p opsdeck-api --test http_routes

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use opsdeck_api::http::create_router;
use opsdeck_cluster::{LoadBalancer, LoadBalancingStrategy, NodeRegistry};
use opsdeck_core::repository::MemoryNodeStore;

fn app() -> Router {
    let registry = Arc::new(NodeRegistry::with_system_clock(Arc::new(
        MemoryNodeStore::new(),
    )));
    let load_balancer = Arc::new(LoadBalancer::new(
        registry.clone(),
        LoadBalancingStrategy::RoundRobin,
    ));
    create_router(registry, load_balancer)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, name: &str, connections: u64) {
    let (status, _) = send(
        app,
        Method::POST,
        "/nodes",
        Some(json!({
            "name": name,
            "address": "10.0.0.1",
            "port": 9000,
            "cpu_cores": 4,
            "memory_gb": 16,
            "disk_gb": 100,
            "metrics": { "active_connections": connections },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn register_then_fetch() {
    let app = app();
    register(&app, "n1", 0).await;

    let (status, body) = send(&app, Method::GET, "/nodes/n1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "n1");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["role"], "worker");

    let (status, body) = send(&app, Method::GET, "/nodes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    register(&app, "n1", 0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/nodes",
        Some(json!({"name": "n1", "address": "10.0.0.2", "port": 9001})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/nodes",
        Some(json!({"name": "bad", "address": "10.0.0.2", "port": 9001, "metrics": {"cpu_usage": 150.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/nodes/bad", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_node_is_not_found() {
    let app = app();
    for (method, uri, body) in [
        (Method::GET, "/nodes/ghost", None),
        (Method::DELETE, "/nodes/ghost", None),
        (Method::POST, "/nodes/ghost/drain", None),
        (
            Method::PUT,
            "/nodes/ghost/status",
            Some(json!({"status": "offline"})),
        ),
        (
            Method::POST,
            "/nodes/ghost/metrics",
            Some(json!({"cpu_usage": 10.0})),
        ),
    ] {
        let (status, body) = send(&app, method, uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["status"], 404);
    }
}

#[tokio::test]
async fn drain_and_restore() {
    let app = app();
    register(&app, "n1", 0).await;

    let (status, body) = send(&app, Method::POST, "/nodes/n1/drain", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "draining");

    let (status, _) = send(&app, Method::GET, "/cluster/select", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/nodes/n1/status",
        Some(json!({"status": "healthy"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/cluster/select", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "n1");
}

#[tokio::test]
async fn unknown_status_is_bad_request() {
    let app = app();
    register(&app, "n1", 0).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/nodes/n1/status",
        Some(json!({"status": "sleeping"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_update_and_validation() {
    let app = app();
    register(&app, "n1", 0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/nodes/n1/metrics",
        Some(json!({"cpu_usage": 42.5, "active_connections": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cpu_usage"], 42.5);
    assert_eq!(body["active_connections"], 7);

    let (status, _) = send(
        &app,
        Method::POST,
        "/nodes/n1/metrics",
        Some(json!({"memory_usage": -1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Rejected update leaves the node untouched
    let (_, body) = send(&app, Method::GET, "/nodes/n1", None).await;
    assert_eq!(body["memory_usage"], 0.0);
}

#[tokio::test]
async fn unregister_removes_node() {
    let app = app();
    register(&app, "n1", 0).await;

    let (status, body) = send(&app, Method::DELETE, "/nodes/n1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    let (status, _) = send(&app, Method::GET, "/nodes/n1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn select_honours_strategy_query() {
    let app = app();
    register(&app, "a", 10).await;
    register(&app, "b", 20).await;
    register(&app, "c", 5).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/cluster/select?strategy=least_connections",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "c");
}

#[tokio::test]
async fn empty_cluster_select_is_unavailable() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/cluster/select", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
}

#[tokio::test]
async fn stats_reflect_registered_nodes() {
    let app = app();
    register(&app, "a", 0).await;
    register(&app, "b", 0).await;
    send(&app, Method::POST, "/nodes/b/drain", None).await;

    let (status, body) = send(&app, Method::GET, "/cluster/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_nodes"], 2);
    assert_eq!(body["healthy_nodes"], 1);
    assert_eq!(body["draining_nodes"], 1);
    assert_eq!(body["total_cpu"], 8);
    assert_eq!(body["total_memory"], 32);
}

#[tokio::test]
async fn malformed_bodies_use_error_payload() {
    let app = app();
    register(&app, "n1", 0).await;

    for (method, uri, body) in [
        (Method::POST, "/nodes", json!({"name": "x"})),
        (Method::POST, "/nodes", json!({"name": "x", "address": "10.0.0.3", "port": "http"})),
        (Method::POST, "/nodes/n1/metrics", json!({"cpu_usage": "high"})),
        (Method::POST, "/nodes/n1/metrics", json!({"active_connections": -3})),
        (Method::PUT, "/nodes/n1/status", json!({})),
    ] {
        let (status, body) = send(&app, method, uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["status"], 400, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }

    // The node is unchanged by the rejected updates
    let (_, body) = send(&app, Method::GET, "/nodes/n1", None).await;
    assert_eq!(body["active_connections"], 0);
    assert_eq!(body["cpu_usage"], 0.0);
}

#[tokio::test]
async fn missing_content_type_is_unsupported() {
    let app = app();
    let request = Request::post("/nodes")
        .body(Body::from(r#"{"name":"n1","address":"10.0.0.1","port":9000}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 415);
}

#[tokio::test]
async fn oversized_counters_are_bad_request() {
    let app = app();
    register(&app, "n1", 0).await;

    let too_many = i64::MAX as u64 + 1;
    let (status, body) = send(
        &app,
        Method::POST,
        "/nodes/n1/metrics",
        Some(json!({"active_connections": too_many})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = send(
        &app,
        Method::POST,
        "/nodes",
        Some(json!({
            "name": "huge",
            "address": "10.0.0.9",
            "port": 9000,
            "metrics": { "active_connections": too_many },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
