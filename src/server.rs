//! HTTP server initialization and runtime setup.
//!
//! Builds the shared pipeline components once and hands them to the router
//! through [`AppState`].

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::ServiceExt;
use axum::extract::Request;

use crate::application::services::{AuthGate, MetricsRegistry, SlidingWindowLimiter, client_ip_key};
use crate::config::{Config, RateLimitSettings};
use crate::domain::token_verifier::{DisabledVerifier, TokenVerifier};
use crate::infrastructure::auth::JwksVerifier;
use crate::infrastructure::persistence::{ConnectionPool, PgProfileRepository};
use crate::routes::app_router;
use crate::state::AppState;

/// Assembles shared state from configuration.
///
/// The connection pool is created here so that a bad connection string fails
/// startup rather than the first request. Connections are opened on demand.
///
/// # Errors
///
/// Returns an error if the database target is invalid or the JWKS HTTP client
/// cannot be built.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let pool = Arc::new(ConnectionPool::new(config.database.clone()));
    pool.get_pool().await?;

    let verifier: Arc<dyn TokenVerifier> = match &config.auth {
        Some(settings) => {
            tracing::info!(
                jwks_url = %settings.jwks_url,
                issuer = %settings.issuer,
                "Bearer token verification enabled"
            );
            Arc::new(JwksVerifier::from_settings(settings)?)
        }
        None => {
            tracing::warn!("AUTH_JWKS_URL not set, admin routes will reject every request");
            Arc::new(DisabledVerifier)
        }
    };

    let profiles = Arc::new(PgProfileRepository::new(pool.clone()));
    let auth = Arc::new(AuthGate::new(verifier, profiles));

    let limiter = |settings: RateLimitSettings| {
        Arc::new(SlidingWindowLimiter::configure(
            settings.window(),
            settings.max,
            client_ip_key(config.behind_proxy),
        ))
    };

    Ok(AppState {
        pool,
        metrics: Arc::new(MetricsRegistry::new()),
        auth,
        public_limiter: limiter(config.rate_limit),
        strict_limiter: limiter(config.strict_rate_limit),
        content_cache_seconds: config.content_cache_seconds,
    })
}

/// Runs the HTTP server until Ctrl+C.
///
/// # Errors
///
/// Returns an error if:
/// - State cannot be built
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let state = build_state(&config).await?;
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
