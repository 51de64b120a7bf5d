//! Domain layer: identities, repository contracts and the token verifier
//! contract. No dependencies on HTTP or database specifics.
//!
//! - [`entities`] - Principal, role and verified token data
//! - [`repositories`] - Data access trait definitions
//! - [`token_verifier`] - Bearer token verification trait and its errors

pub mod entities;
pub mod repositories;
pub mod token_verifier;
