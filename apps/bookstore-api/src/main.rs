//! # Bookstore API Server
//!
//! ```text
//! client ───► HTTP (8000) ───► routes ───► bookstore-db ───► SQLite
//! ```

use std::net::SocketAddr;

use bookstore_api::{bootstrap_admin, build_app, ApiConfig, AppState};
use bookstore_db::{Database, DbConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bookstore=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting bookstore API server...");

    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("BOOKSTORE_JWT_SECRET is not set, signing tokens with the development secret");
    }

    let db = Database::new(
        DbConfig::new(config.database_path.clone()).max_connections(config.db_max_connections),
    )
    .await?;
    info!("Database ready, migrations applied");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(db.clone(), config);

    if bootstrap_admin(&state).await? {
        warn!("Created the bootstrap supervisor, change its password");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
