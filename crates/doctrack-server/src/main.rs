//! DocTrack Server — application entry point.

use std::time::Duration;

use doctrack_db::{DbManager, run_migrations};
use doctrack_server::{AppState, ServerConfig, build_app};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("doctrack=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    if let Err(e) = run().await {
        error!(error = %e, "DocTrack server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting DocTrack server...");

    let config = ServerConfig::load()?;
    let settings = config.app_settings()?;

    let db = DbManager::connect(&config.db_config()).await?;
    run_migrations(db.client()).await?;

    let state = AppState::new(db.client().clone(), settings)?;
    spawn_session_sweeper(
        state.clone(),
        Duration::from_secs(config.session_cleanup_interval_secs.max(60)),
    );

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("DocTrack server stopped.");
    Ok(())
}

/// Periodically delete expired session rows.
fn spawn_session_sweeper(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match state.auth.cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Expired sessions removed"),
                Err(e) => warn!(error = %e, "Session cleanup failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
