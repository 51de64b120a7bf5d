//! Lazily created, shared PostgreSQL pool.
//!
//! The pool is built from [`DatabaseSettings`] on the first call to
//! [`ConnectionPool::get_pool`]. Concurrent first calls all wait on the same
//! initialization and observe the same pool. Queries borrow a connection as an
//! RAII guard, so the connection goes back to the pool on every exit path,
//! including a request future dropped mid-query.

use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::{ConfigError, DatabaseSettings, mask_connection_string};

/// Errors surfaced by [`ConnectionPool`].
///
/// Query failures are carried unchanged; there are no retries.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

/// A positional query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(Value),
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_owned())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<Value> for SqlParam {
    fn from(v: Value) -> Self {
        SqlParam::Json(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlParam::Null, Into::into)
    }
}

impl SqlParam {
    fn bind_to<'q>(
        &self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.clone()),
            SqlParam::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        }
    }
}

/// Owner of the process-wide pool.
///
/// Constructed once by bootstrap and shared through `AppState`.
#[derive(Debug)]
pub struct ConnectionPool {
    settings: DatabaseSettings,
    pool: OnceCell<PgPool>,
}

impl ConnectionPool {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            pool: OnceCell::new(),
        }
    }

    /// Returns the shared pool, creating it on first use.
    ///
    /// Creation does not open connections; they are established on demand.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the connection target is missing or malformed.
    /// The pool is not cached in that case.
    pub async fn get_pool(&self) -> Result<&PgPool, ConfigError> {
        self.pool.get_or_try_init(|| async { self.build() }).await
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    fn build(&self) -> Result<PgPool, ConfigError> {
        let url = self.settings.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let options = PgConnectOptions::from_str(url).map_err(|e| {
            ConfigError::Invalid(format!("DATABASE_URL is not a valid connection string: {e}"))
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(Duration::from_secs(self.settings.acquire_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(self.settings.idle_timeout_secs)))
            .max_lifetime(Some(Duration::from_secs(self.settings.max_lifetime_secs)))
            .connect_lazy_with(options);

        tracing::info!(
            database = %mask_connection_string(url),
            max_connections = self.settings.max_connections,
            "Connection pool created"
        );

        Ok(pool)
    }

    /// Executes `sql` with positional `params` on a borrowed connection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Configuration`] if the pool cannot be created and
    /// [`PoolError::Query`] with the driver error as-is otherwise.
    pub async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<PgRow>, PoolError> {
        let pool = self.get_pool().await?;
        let mut conn = pool.acquire().await?;

        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, param| param.bind_to(query));

        let rows = query.fetch_all(&mut *conn).await?;
        Ok(rows)
    }

    /// Like [`query`](Self::query), returning each row as a JSON object keyed by
    /// column name.
    pub async fn query_json(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Value>, PoolError> {
        let wrapped = format!("SELECT to_jsonb(t) AS row FROM ({sql}) AS t");
        let rows = self.query(&wrapped, params).await?;

        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(PoolError::from))
            .collect()
    }
}
