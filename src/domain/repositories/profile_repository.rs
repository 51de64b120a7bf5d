//! Repository trait for user profiles.

use async_trait::async_trait;

use crate::infrastructure::persistence::PoolError;

/// Read access to the persistent profile store.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgProfileRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Loads the role stored for a token subject.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(role))` if a profile exists
    /// - `Ok(None)` if the subject has no profile
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] if the store cannot be queried.
    async fn find_role(&self, subject: &str) -> Result<Option<String>, PoolError>;
}
