//! HTTP middleware stages of the request pipeline.
//!
//! Global, in order from the outside in:
//!
//! 1. [`correlation`] - request id, span, `X-Request-Id` response header
//! 2. [`access_log`] - structured access log and request metrics
//! 3. [`recover`] - panics become `500` responses
//!
//! Per route, as configured in [`crate::api::pipeline::RouteOptions`]:
//!
//! 4. [`rate_limit`] - sliding window per client key
//! 5. [`auth`] - admin gate
//! 6. [`normalize`] - key casing, `ETag`, `Cache-Control`, `304`

pub mod access_log;
pub mod auth;
pub mod correlation;
pub mod normalize;
pub mod rate_limit;
pub mod recover;
