//! Data Transfer Objects for API requests and responses.
//!
//! Response DTOs use persistence-style snake_case field names; the response
//! normalizer rewrites them for clients.

pub mod health;
pub mod pagination;
