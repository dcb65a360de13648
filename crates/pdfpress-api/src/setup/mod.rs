//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod temp_store;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use pdfpress_core::Config;
use pdfpress_processing::{GhostscriptCompressor, PdfCompressor};
use std::sync::Arc;
use std::time::Duration;

/// Interval between purges of expired login-failure entries
const AUTH_LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Initialize telemetry first so configuration problems are logged
    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Validate configuration - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    tracing::info!(
        environment = %config.environment(),
        auth_enabled = config.auth_enabled(),
        "Configuration loaded and validated successfully"
    );

    // Prepare the temp directory and collect leftovers from earlier runs
    let temp_store = temp_store::setup_temp_store(&config)?;

    let compressor: Arc<dyn PdfCompressor> = Arc::new(GhostscriptCompressor::new(
        config.ghostscript_path(),
        Duration::from_secs(config.compression_timeout_secs()),
    ));

    let state = Arc::new(AppState::new(config.clone(), temp_store, compressor));

    if let Some(auth) = &state.auth {
        let limiter = auth.failure_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(AUTH_LIMITER_PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                let pruned = limiter.prune_expired().await;
                if pruned > 0 {
                    tracing::debug!(pruned, "Pruned expired login failure entries");
                }
            }
        });
    }

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
