//! Handler for the health check endpoint.

use std::time::Instant;

use axum::{extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::api::reply::Reply;
use crate::error::AppError;
use crate::state::AppState;

/// Returns service health with a database probe.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: database reachable
/// - **503 Service Unavailable**: database probe failed
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": { "database": { "status": "ok", "latency_ms": 2 } }
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Result<Reply, AppError> {
    let database = check_database(&state).await;
    let healthy = database.is_ok();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { database },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Reply::json_with_status(status, &response)
}

async fn check_database(state: &AppState) -> CheckStatus {
    let start = Instant::now();
    match state.pool.query("SELECT 1", &[]).await {
        Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
        Err(e) => {
            tracing::warn!(error = %e, "Database health probe failed");
            CheckStatus::error(format!("Database error: {e}"))
        }
    }
}
