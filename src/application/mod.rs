//! Application layer services.
//!
//! Services hold the decision logic of the request pipeline and know nothing
//! about routing. HTTP middleware in [`crate::api::middleware`] adapts them.
//!
//! # Available Services
//!
//! - [`services::auth_gate::AuthGate`] - Bearer verification and admin role check
//! - [`services::rate_limiter::SlidingWindowLimiter`] - Per-key sliding window limits
//! - [`services::metrics_registry::MetricsRegistry`] - Request counters and latencies

pub mod services;
