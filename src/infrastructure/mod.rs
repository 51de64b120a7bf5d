//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`auth`] - Remote JSON Web Key Set fetching and JWT verification
//! - [`persistence`] - PostgreSQL pool and repository implementations

pub mod auth;
pub mod persistence;
