//! Sliding-window rate limiter.
//!
//! Each key owns a queue of exact request timestamps. A check appends the
//! current time, drops everything that fell out of the trailing window and
//! rejects when more than `max` timestamps remain. The triggering request is
//! counted before the threshold comparison, and rejected requests stay in the
//! window.
//!
//! Limiting is best-effort: if the key cannot be computed or the bucket map is
//! unusable the request is let through as [`RateDecision::ErrorFallbackAllowed`].
//!
//! Buckets are never reclaimed. A process that sees many distinct clients
//! grows one (possibly empty) queue per client for its whole lifetime.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use thiserror::Error;

/// Shared bucket for requests whose client cannot be identified.
pub const UNKNOWN_KEY: &str = "unknown";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("could not derive rate limit key: {0}")]
    Key(String),

    #[error("rate limit state is poisoned")]
    Poisoned,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied,
    /// The limiter failed internally and let the request through.
    ErrorFallbackAllowed(RateLimitError),
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, RateDecision::Denied)
    }
}

/// Monotonic time source, as an offset from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Derives the bucket key for a request.
pub type KeyFn = Arc<dyn Fn(&Request) -> Result<String, RateLimitError> + Send + Sync>;

/// Keys requests by client IP.
///
/// Behind a trusted proxy the first `X-Forwarded-For` entry (then `X-Real-IP`)
/// is used; otherwise the socket peer address. Requests without any of these
/// share the [`UNKNOWN_KEY`] bucket.
pub fn client_ip_key(behind_proxy: bool) -> KeyFn {
    Arc::new(move |req: &Request| {
        if behind_proxy {
            for header in ["x-forwarded-for", "x-real-ip"] {
                if let Some(value) = req.headers().get(header) {
                    let raw = value
                        .to_str()
                        .map_err(|_| RateLimitError::Key(format!("{header} is not valid ASCII")))?;
                    if let Some(ip) = raw.split(',').map(str::trim).find(|s| !s.is_empty()) {
                        return Ok(ip.to_string());
                    }
                }
            }
        }

        Ok(req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_KEY.to_string()))
    })
}

/// Per-key sliding-window limiter.
pub struct SlidingWindowLimiter {
    window: Duration,
    max: usize,
    key_fn: KeyFn,
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, VecDeque<Duration>>>,
}

impl SlidingWindowLimiter {
    /// Binds a limiter allowing `max` requests per key within `window`.
    pub fn configure(window: Duration, max: usize, key_fn: KeyFn) -> Self {
        Self::with_clock(window, max, key_fn, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(window: Duration, max: usize, key_fn: KeyFn, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            max,
            key_fn,
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Derives the request's key and checks it.
    pub fn evaluate(&self, req: &Request) -> RateDecision {
        match (self.key_fn)(req) {
            Ok(key) => self.check(&key),
            Err(e) => RateDecision::ErrorFallbackAllowed(e),
        }
    }

    /// Records a request for `key` and decides whether it is within the limit.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = self.clock.now();

        let Ok(mut buckets) = self.buckets.lock() else {
            return RateDecision::ErrorFallbackAllowed(RateLimitError::Poisoned);
        };

        let bucket = buckets.entry(key.to_owned()).or_default();

        // Keep the queue sorted even if the clock source steps backwards.
        let stamp = bucket.back().map_or(now, |last| now.max(*last));
        bucket.push_back(stamp);

        if let Some(cutoff) = now.checked_sub(self.window) {
            while bucket.front().is_some_and(|t| *t <= cutoff) {
                bucket.pop_front();
            }
        }

        if bucket.len() > self.max {
            RateDecision::Denied
        } else {
            RateDecision::Allowed
        }
    }

    /// Number of keys that have ever been seen.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl std::fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("window", &self.window)
            .field("max", &self.max)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}
