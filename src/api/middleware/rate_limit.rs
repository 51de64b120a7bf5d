//! Sliding-window rate limiting.
//!
//! Wraps a [`SlidingWindowLimiter`] bound to one route. Denied requests get
//! `429` with `{"error":"Rate limit exceeded"}`. If the limiter cannot reach a
//! decision the request is let through and the failure is logged and counted.
//!
//! # Example
//!
//! ```rust,ignore
//! let limiter = Arc::new(SlidingWindowLimiter::configure(window, 60, client_ip_key(false)));
//! let route = get(handler).layer(middleware::from_fn_with_state(limiter, rate_limit::layer));
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::application::services::{RateDecision, SlidingWindowLimiter};
use crate::error::AppError;

pub async fn layer(
    State(limiter): State<Arc<SlidingWindowLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    match limiter.evaluate(&req) {
        RateDecision::Allowed => next.run(req).await,
        RateDecision::ErrorFallbackAllowed(e) => {
            tracing::warn!(
                error = %e,
                path = %req.uri().path(),
                "Rate limiter failed, allowing request"
            );
            metrics::counter!("rate_limit_fail_open_total").increment(1);
            next.run(req).await
        }
        RateDecision::Denied => {
            tracing::warn!(
                path = %req.uri().path(),
                window_ms = millis(limiter.window()),
                max = limiter.max(),
                "Rate limit exceeded"
            );
            metrics::counter!("rate_limit_denied_total").increment(1);
            AppError::RateLimited.into_response()
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
