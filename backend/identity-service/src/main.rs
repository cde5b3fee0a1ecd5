/// Identity Service Main Entry Point
///
/// Prepares the identity store and keeps it tidy:
/// - PostgreSQL connection pool
/// - Database migrations
/// - Signing key validation
/// - Expired refresh session sweeper (background task)
use anyhow::{Context, Result};
use identity_service::{
    config::Settings,
    db::{PgAccountStore, PgRoleStore, PgSessionStore},
    services::spawn_session_sweeper,
    AuthService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "identity_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Identity Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!(
        access_ttl_secs = settings.jwt.access_ttl.as_secs(),
        refresh_ttl_secs = settings.jwt.refresh_ttl.as_secs(),
        "Configuration loaded successfully"
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .min_connections(settings.database.min_connections)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    // Fails fast on an unusable JWT secret
    let auth = AuthService::from_stores(
        &settings.jwt,
        Arc::new(PgAccountStore::new(db_pool.clone())),
        Arc::new(PgRoleStore::new(db_pool.clone())),
        Arc::new(PgSessionStore::new(db_pool.clone())),
    )
    .context("Failed to initialize token issuer")?;
    info!("Token issuer initialized");

    // Spawn expired session sweeper (background task)
    let sweeper = spawn_session_sweeper(auth.tokens(), settings.housekeeping.sweep_interval);

    shutdown_signal().await;

    sweeper.abort();
    db_pool.close().await;
    info!("Identity service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
