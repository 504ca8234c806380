// CNAB Store - Web Server
// Upload CNAB files and browse store balances over HTTP

use anyhow::{Context, Result};
use cnab_store::api::{router, AppState};
use cnab_store::{init_tracing, open_database, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    // Migrations run on every startup
    let conn = open_database(&config.database_path)?;
    info!(path = %config.database_path.display(), "Database ready");

    let app = router(AppState::new(conn), config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "🚀 Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
