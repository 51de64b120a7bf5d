mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Router, routing::get};
use axum_test::TestServer;
use cms_backend::api::middleware::normalize::NormalizeOptions;
use cms_backend::api::pipeline::{RouteOptions, mount};
use cms_backend::api::reply::Reply;
use cms_backend::application::services::MetricsRegistry;
use cms_backend::routes::api_router;
use serde_json::json;

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let server = TestServer::new(api_router(common::test_app(100).state)).unwrap();

    let response = server.get("/does-not-exist").await;

    response.assert_status_not_found();
    assert_eq!(
        common::body_json(response.as_bytes()),
        json!({"error": "Not found"})
    );
    assert!(response.maybe_header("x-request-id").is_some());
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let server = TestServer::new(api_router(common::test_app(100).state)).unwrap();

    let response = server.get("/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body = common::body_json(response.as_bytes());
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["database"]["status"], "error");
    assert_eq!(response.header("cache-control"), "no-store");
}

#[tokio::test]
async fn test_invalid_slug_is_rejected_before_querying() {
    let server = TestServer::new(api_router(common::test_app(100).state)).unwrap();

    let response = server
        .get("/api/projects/Not_A_Slug")
        .add_header("x-forwarded-for", "5.6.7.8")
        .await;

    response.assert_status_bad_request();
    assert_eq!(
        common::body_json(response.as_bytes()),
        json!({"error": "Invalid project slug"})
    );
}

#[tokio::test]
async fn test_invalid_pagination_is_rejected() {
    let server = TestServer::new(api_router(common::test_app(100).state)).unwrap();

    server
        .get("/api/projects")
        .add_query_param("page", 0)
        .add_header("x-forwarded-for", "5.6.7.8")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_unparsable_pagination_is_json_400() {
    let server = TestServer::new(api_router(common::test_app(100).state)).unwrap();

    let response = server
        .get("/api/projects")
        .add_query_param("page", "abc")
        .add_header("x-forwarded-for", "5.6.7.8")
        .await;

    response.assert_status_bad_request();
    assert!(
        response
            .header("content-type")
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    let body = common::body_json(response.as_bytes());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unsupported_method_is_json_405() {
    let server = TestServer::new(api_router(common::test_app(100).state)).unwrap();

    let response = server
        .post("/api/projects")
        .add_header("x-forwarded-for", "5.6.7.8")
        .await;

    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        common::body_json(response.as_bytes()),
        json!({"error": "Method not allowed"})
    );
    assert!(response.maybe_header("x-request-id").is_some());
}

#[tokio::test]
async fn test_public_routes_share_the_public_limiter() {
    let server = TestServer::new(api_router(common::test_app(2).state)).unwrap();

    for _ in 0..2 {
        server
            .get("/api/projects/Bad")
            .add_header("x-forwarded-for", "5.6.7.8")
            .await
            .assert_status_bad_request();
    }

    server
        .get("/api/projects")
        .add_header("x-forwarded-for", "5.6.7.8")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_database_failure_is_500_with_request_id() {
    let server = TestServer::new(api_router(common::test_app(100).state)).unwrap();

    let response = server
        .get("/api/projects/hello-world")
        .add_header("x-forwarded-for", "5.6.7.8")
        .add_header("x-request-id", "db-failure-1")
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response.as_bytes());
    assert_eq!(body["error"], "Database error");
    assert_eq!(body["requestId"], "db-failure-1");
    assert!(body["detail"].is_string());
}

async fn panicking_handler() -> Reply {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_panic_becomes_500_carrying_request_id() {
    let metrics = Arc::new(MetricsRegistry::new());
    let router = Router::new().route(
        "/boom",
        mount(get(panicking_handler), RouteOptions::new(NormalizeOptions::default())),
    );
    let server = common::serve(router, metrics.clone());

    let response = server.get("/boom").add_header("x-request-id", "panic-42").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.header("x-request-id"), "panic-42");
    let body = common::body_json(response.as_bytes());
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["requestId"], "panic-42");
    assert_eq!(metrics.counter("http_requests_status_500"), 1);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let router = Router::new().route(
        "/ping",
        mount(
            get(|| async { Reply::ok(json!({"pong": true})) }),
            RouteOptions::default(),
        ),
    );
    let server = common::serve(router, Arc::new(MetricsRegistry::new()));

    let echoed = server.get("/ping").add_header("x-request-id", "client-id-1").await;
    assert_eq!(echoed.header("x-request-id"), "client-id-1");

    let generated = server.get("/ping").await;
    let id = generated.header("x-request-id");
    let id = id.to_str().unwrap();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

    let replaced = server
        .get("/ping")
        .add_header("x-request-id", "x".repeat(200))
        .await;
    assert_eq!(replaced.header("x-request-id").len(), 32);
}
