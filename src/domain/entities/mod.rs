//! Core domain entities.
//!
//! - [`Principal`] - An authenticated caller with a role from the profile store
//! - [`VerifiedToken`] - Claims of a bearer token that passed verification
//! - [`Role`] - Profile role; only [`Role::Admin`] unlocks admin routes

pub mod principal;

pub use principal::{Principal, Role, VerifiedToken};
