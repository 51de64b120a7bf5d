//! Admin gate middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::application::services::AuthGate;
use crate::error::AppError;

/// Lets the request through only for a verified admin.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <jwt>
/// ```
///
/// On success the resolved [`Principal`](crate::domain::entities::Principal)
/// is inserted into request extensions for handlers to extract.
///
/// # Errors
///
/// - `401 Unauthorized` for a missing, malformed, expired or unverifiable token
/// - `403 Forbidden` for a verified caller without the `admin` role
/// - `500` if the profile store cannot be queried
pub async fn require_admin(
    State(gate): State<Arc<AuthGate>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let principal = gate.require_admin(&mut parts).await?;
    tracing::debug!(subject = %principal.subject, "Admin access granted");

    parts.extensions.insert(principal);
    let req = Request::from_parts(parts, body);

    Ok(next.run(req).await)
}
