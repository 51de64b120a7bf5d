//! PostgreSQL access.
//!
//! - [`ConnectionPool`] - Lazily created shared pool with scoped connection use
//! - [`PgProfileRepository`] - Profile role lookup for the admin gate

pub mod pg_profile_repository;
pub mod pool;

pub use pg_profile_repository::PgProfileRepository;
pub use pool::{ConnectionPool, PoolError, SqlParam};
