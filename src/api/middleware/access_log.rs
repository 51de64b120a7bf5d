//! Access logging and request metrics.
//!
//! Records one structured log line and one set of counter increments per
//! completed request, including requests that were rejected further in.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::middleware::correlation::RequestId;
use crate::application::services::MetricsRegistry;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION_MS: &str = "http_request_duration_ms";

/// Name of the per-method counter, e.g. `http_requests_method_get`.
pub fn method_counter(method: &str) -> String {
    format!("http_requests_method_{}", method.to_ascii_lowercase())
}

/// Name of the per-status counter, e.g. `http_requests_status_404`.
pub fn status_counter(status: u16) -> String {
    format!("http_requests_status_{status}")
}

pub async fn layer(
    State(metrics): State<Arc<MetricsRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(RequestId::to_string)
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    metrics.inc(REQUESTS_TOTAL);
    metrics.inc(&method_counter(&method));
    metrics.inc(&status_counter(status));
    metrics.observe(REQUEST_DURATION_MS, duration_ms);

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status,
        duration_ms,
        "{method} {path} {status}"
    );

    response
}
