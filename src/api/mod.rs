//! HTTP layer: handlers, DTOs, middleware and pipeline composition.
//!
//! # Modules
//!
//! - [`dto`] - Request/response data shapes
//! - [`handlers`] - Business handlers returning [`reply::Reply`]
//! - [`middleware`] - Pipeline stages
//! - [`pipeline`] - Per-route and global stage composition
//! - [`reply`] - Handler output contract

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod reply;
