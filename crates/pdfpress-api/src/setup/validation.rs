//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use pdfpress_core::Config;

/// Validate critical configuration values
///
/// Hard errors come from `Config::validate`; risky but legal combinations are logged.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let is_production = config.is_production();

    if is_production && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production - this is a security risk. \
            Please set specific allowed origins via CORS_ORIGINS environment variable."
        ));
    }

    match config.auth() {
        Some(auth) => {
            if config.trusted_proxy_count() == 0 {
                tracing::info!(
                    "TRUSTED_PROXY_COUNT=0 - login throttling is keyed by the socket address; behind a reverse proxy all clients share one bucket"
                );
            }
            if is_production && !auth.cookie_secure {
                tracing::warn!("COOKIE_SECURE is disabled in production - session cookies may travel over plain HTTP");
            }
        }
        None => {
            tracing::warn!("AUTH_ENABLED=false - /compress is open to anyone who can reach this service");
        }
    }

    if config.trusted_proxy_count() > 10 {
        tracing::warn!(
            trusted_proxy_count = config.trusted_proxy_count(),
            "TRUSTED_PROXY_COUNT is very high - ensure this matches your actual proxy setup"
        );
    }

    Ok(())
}
