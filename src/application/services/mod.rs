//! Request-pipeline services shared by the middleware stages.

pub mod auth_gate;
pub mod metrics_registry;
pub mod rate_limiter;

pub use auth_gate::{AuthGate, Identity};
pub use metrics_registry::{LatencySummary, MetricsRegistry, MetricsSnapshot};
pub use rate_limiter::{
    Clock, KeyFn, ManualClock, MonotonicClock, RateDecision, RateLimitError, SlidingWindowLimiter,
    client_ip_key,
};
