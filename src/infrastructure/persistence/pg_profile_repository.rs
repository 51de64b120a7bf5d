//! PostgreSQL implementation of profile repository.

use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

use crate::domain::repositories::ProfileRepository;
use crate::infrastructure::persistence::{ConnectionPool, PoolError, SqlParam};

/// Reads roles from the `profiles` table, keyed by the token subject.
pub struct PgProfileRepository {
    pool: Arc<ConnectionPool>,
}

impl PgProfileRepository {
    /// Creates a new repository over the shared connection pool.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_role(&self, subject: &str) -> Result<Option<String>, PoolError> {
        let rows = self
            .pool
            .query(
                r#"
                SELECT role
                FROM profiles
                WHERE id::text = $1
                LIMIT 1
                "#,
                &[SqlParam::from(subject)],
            )
            .await?;

        match rows.first() {
            Some(row) => Ok(row.try_get::<Option<String>, _>("role")?),
            None => Ok(None),
        }
    }
}
