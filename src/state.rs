//! Shared application state.

use std::sync::Arc;

use crate::application::services::{AuthGate, MetricsRegistry, SlidingWindowLimiter};
use crate::infrastructure::persistence::ConnectionPool;

/// Everything handlers and middleware share, built once by bootstrap.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ConnectionPool>,
    pub metrics: Arc<MetricsRegistry>,
    pub auth: Arc<AuthGate>,
    /// Limiter for public content reads.
    pub public_limiter: Arc<SlidingWindowLimiter>,
    /// Limiter for admin routes.
    pub strict_limiter: Arc<SlidingWindowLimiter>,
    /// `Cache-Control` lifetime for published content, `0` for `no-store`.
    pub content_cache_seconds: u64,
}
