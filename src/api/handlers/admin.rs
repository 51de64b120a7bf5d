//! Admin-only endpoints. Mounted behind the admin gate, which inserts the
//! [`Principal`] into request extensions.

use axum::{Extension, extract::State};

use crate::api::reply::Reply;
use crate::domain::entities::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/admin/session` - the calling admin.
pub async fn session_handler(
    Extension(principal): Extension<Principal>,
) -> Result<Reply, AppError> {
    Reply::json(&principal)
}

/// `GET /api/admin/metrics` - counters and latency summaries since start.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Reply, AppError> {
    Reply::json(&state.metrics.snapshot())
}
