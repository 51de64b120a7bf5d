//! Bearer token verification contract.

use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use thiserror::Error;

use crate::domain::entities::VerifiedToken;

/// Why a bearer token could not be verified.
///
/// Never surfaced to clients: the auth gate downgrades every variant to an
/// anonymous caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token verification is not configured")]
    NotConfigured,

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("no key with id '{0}' in the key set")]
    UnknownKeyId(String),

    #[error("algorithm {0:?} is not accepted")]
    UnsupportedAlgorithm(Algorithm),

    #[error("failed to fetch key set: {0}")]
    KeyFetch(String),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Verifies a raw bearer token and returns its claims.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

/// Verifier used when no key set is configured. Rejects every token.
#[derive(Debug, Default)]
pub struct DisabledVerifier;

#[async_trait]
impl TokenVerifier for DisabledVerifier {
    async fn verify(&self, _token: &str) -> Result<VerifiedToken, AuthError> {
        Err(AuthError::NotConfigured)
    }
}
