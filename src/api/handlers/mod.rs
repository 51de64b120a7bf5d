//! HTTP request handlers.
//!
//! Handlers return a [`Reply`](crate::api::reply::Reply) or an
//! [`AppError`]; casing, caching headers, auth and rate limiting are applied
//! around them.

pub mod admin;
pub mod health;
pub mod projects;

pub use admin::{metrics_handler, session_handler};
pub use health::health_handler;
pub use projects::{list_projects_handler, project_handler};

use crate::error::AppError;

/// Fallback for unmatched routes.
pub async fn not_found_handler() -> AppError {
    AppError::not_found("Not found")
}

/// Fallback for known paths hit with a method they do not serve.
pub async fn method_not_allowed_handler() -> AppError {
    AppError::MethodNotAllowed
}
