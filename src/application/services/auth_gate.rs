//! Identity verification and the admin gate.
//!
//! ```text
//! no token ─────────────────────────────► Anonymous
//! token ─► verified ─► role = admin ────► Authorized(Principal)
//!             │       └► role ≠ admin ──► Forbidden (403)
//!             └► verification failed ───► Anonymous
//! Anonymous at the admin gate ──────────► Unauthorized (401)
//! ```
//!
//! Verification problems never raise: a bad, expired or unverifiable token is
//! treated exactly like a missing one.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_auth::AuthBearer;

use crate::domain::entities::{Principal, Role, VerifiedToken};
use crate::domain::repositories::ProfileRepository;
use crate::domain::token_verifier::TokenVerifier;
use crate::error::AppError;

/// Who is calling, before any role check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Verified(VerifiedToken),
}

/// Token verification plus role-based authorization.
pub struct AuthGate {
    verifier: Arc<dyn TokenVerifier>,
    profiles: Arc<dyn ProfileRepository>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { verifier, profiles }
    }

    /// Resolves the caller from the `Authorization: Bearer` header.
    pub async fn verify_identity(&self, parts: &mut Parts) -> Identity {
        let Ok(AuthBearer(token)) = AuthBearer::from_request_parts(parts, &()).await else {
            return Identity::Anonymous;
        };

        match self.verifier.verify(&token).await {
            Ok(verified) => Identity::Verified(verified),
            Err(e) => {
                tracing::warn!(error = %e, "Bearer token rejected, continuing as anonymous");
                Identity::Anonymous
            }
        }
    }

    /// Admits only verified callers whose profile role is `admin`.
    ///
    /// # Errors
    ///
    /// - [`AppError::Unauthorized`] if there is no verified identity
    /// - [`AppError::Forbidden`] if the profile is missing or not an admin
    /// - [`AppError::Internal`] if the profile store cannot be queried
    ///
    /// The error is the terminal response; callers must not run the handler.
    pub async fn require_admin(&self, parts: &mut Parts) -> Result<Principal, AppError> {
        let Identity::Verified(token) = self.verify_identity(parts).await else {
            return Err(AppError::Unauthorized);
        };

        let Some(role) = self.profiles.find_role(&token.subject).await? else {
            tracing::warn!(subject = %token.subject, "Verified caller has no profile");
            return Err(AppError::Forbidden);
        };

        let principal = Principal::new(token, Role::from(role));
        if !principal.is_admin() {
            tracing::warn!(
                subject = %principal.subject,
                role = ?principal.role,
                "Admin role required"
            );
            return Err(AppError::Forbidden);
        }

        Ok(principal)
    }
}
