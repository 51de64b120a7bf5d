//! Composition of the request pipeline.
//!
//! Every request runs the stages in a fixed order:
//!
//! ```text
//! correlation → access log → panic recovery          (global, Router-wide)
//!   → rate limit? → admin gate? → handler → normalizer   (per route)
//! ```
//!
//! Global stages are applied once by [`with_global_layers`]. Per-route stages
//! are chosen with [`RouteOptions`] and attached by [`mount`]. Handlers only
//! return a [`Reply`](crate::api::reply::Reply) and know nothing of the stages
//! around them.

use std::sync::Arc;

use axum::{Router, middleware, routing::MethodRouter};

use crate::api::handlers::method_not_allowed_handler;
use crate::api::middleware::normalize::{self, NormalizeOptions};
use crate::api::middleware::{access_log, auth, correlation, rate_limit, recover};
use crate::application::services::{AuthGate, MetricsRegistry, SlidingWindowLimiter};

/// Stages wrapped around one route.
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub rate_limit: Option<Arc<SlidingWindowLimiter>>,
    pub require_admin: Option<Arc<AuthGate>>,
    pub normalize: NormalizeOptions,
}

impl RouteOptions {
    pub fn new(normalize: NormalizeOptions) -> Self {
        Self {
            normalize,
            ..Self::default()
        }
    }

    pub fn rate_limited(mut self, limiter: Arc<SlidingWindowLimiter>) -> Self {
        self.rate_limit = Some(limiter);
        self
    }

    pub fn admin(mut self, gate: Arc<AuthGate>) -> Self {
        self.require_admin = Some(gate);
        self
    }
}

/// Wraps `route` in its per-route stages.
///
/// Layers added later run earlier, so the normalizer goes on first and the
/// limiter last. Methods the route does not serve get a JSON `405`.
pub fn mount<S>(route: MethodRouter<S>, options: RouteOptions) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut route = route
        .fallback(method_not_allowed_handler)
        .layer(middleware::from_fn_with_state(
            options.normalize,
            normalize::layer,
        ));

    if let Some(gate) = options.require_admin {
        route = route.layer(middleware::from_fn_with_state(gate, auth::require_admin));
    }

    if let Some(limiter) = options.rate_limit {
        route = route.layer(middleware::from_fn_with_state(limiter, rate_limit::layer));
    }

    route
}

/// Applies the stages every request goes through, including unmatched ones.
pub fn with_global_layers<S>(router: Router<S>, metrics: Arc<MetricsRegistry>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn(recover::layer))
        .layer(middleware::from_fn_with_state(metrics, access_log::layer))
        .layer(middleware::from_fn(correlation::layer))
}
