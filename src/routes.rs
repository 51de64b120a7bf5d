//! Top-level router.
//!
//! # Route Structure
//!
//! | Route                        | Rate limit | Admin | Keys  | Cache-Control          |
//! |------------------------------|------------|-------|-------|------------------------|
//! | `GET /health`                | -          | -     | as is | `no-store`             |
//! | `GET /api/projects`          | public     | -     | camel | `public, max-age=<n>`  |
//! | `GET /api/projects/{slug}`   | public     | -     | camel | `public, max-age=<n>`  |
//! | `GET /api/admin/session`     | strict     | yes   | camel | `no-store`             |
//! | `GET /api/admin/metrics`     | strict     | yes   | as is | `no-store`             |
//!
//! `<n>` is `CONTENT_CACHE_SECONDS`. The metrics snapshot serializes its own
//! field names so that metric names inside it are not rewritten. Every
//! request, including unmatched ones, passes through correlation, access
//! logging and panic recovery. Unsupported methods on a known path get a JSON
//! `405`.

use axum::{Router, routing::get};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api::handlers::{
    health_handler, list_projects_handler, metrics_handler, not_found_handler, project_handler,
    session_handler,
};
use crate::api::middleware::normalize::NormalizeOptions;
use crate::api::pipeline::{RouteOptions, mount, with_global_layers};
use crate::state::AppState;

/// All routes with their pipeline stages, without path normalization.
pub fn api_router(state: AppState) -> Router {
    let public = RouteOptions::new(NormalizeOptions::camel(state.content_cache_seconds))
        .rate_limited(state.public_limiter.clone());

    let admin = RouteOptions::new(NormalizeOptions::camel(0))
        .rate_limited(state.strict_limiter.clone())
        .admin(state.auth.clone());

    let admin_verbatim = RouteOptions {
        normalize: NormalizeOptions::default(),
        ..admin.clone()
    };

    let router = Router::new()
        .route(
            "/health",
            mount(get(health_handler), RouteOptions::default()),
        )
        .route(
            "/api/projects",
            mount(get(list_projects_handler), public.clone()),
        )
        .route("/api/projects/{slug}", mount(get(project_handler), public))
        .route("/api/admin/session", mount(get(session_handler), admin))
        .route(
            "/api/admin/metrics",
            mount(get(metrics_handler), admin_verbatim),
        )
        .fallback(not_found_handler)
        .with_state(state.clone());

    with_global_layers(router, state.metrics)
}

/// Constructs the application router; trailing slashes are trimmed before
/// routing.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(api_router(state))
}
