//! Server startup and graceful shutdown

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use pdfpress_core::Config;
use std::net::SocketAddr;
use std::sync::Arc;

/// Start the server with graceful shutdown, then wipe the temp directory
pub async fn start_server(config: &Config, app: Router, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", config.server_host(), config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        max_upload_mb = config.max_upload_size_bytes() / 1024 / 1024,
        ghostscript_path = %config.ghostscript_path(),
        compression_timeout_secs = config.compression_timeout_secs(),
        temp_dir = %config.temp_dir().display(),
        auth_enabled = config.auth_enabled(),
        "Server ready and accepting connections"
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // Runs whether serving ended cleanly or not
    let store = state.temp_store.clone();
    match tokio::task::spawn_blocking(move || store.wipe_all()).await {
        Ok(removed) => tracing::info!(removed, "Temp directory wiped on shutdown"),
        Err(e) => tracing::warn!(error = %e, "Temp wipe task failed on shutdown"),
    }

    served.context("Server error")?;
    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
