//! Temp directory preparation and background sweeping

use anyhow::{Context, Result};
use pdfpress_core::Config;
use pdfpress_processing::TempStore;
use std::sync::Arc;
use std::time::Duration;

/// Create the temp directory, sweep stale files, and start the periodic sweep if enabled.
pub fn setup_temp_store(config: &Config) -> Result<Arc<TempStore>> {
    let store = Arc::new(TempStore::new(config.temp_dir()));

    store.ensure_directory().with_context(|| {
        format!(
            "Temp directory {} is not usable",
            config.temp_dir().display()
        )
    })?;

    let max_age = Duration::from_secs(config.temp_max_age_secs());
    let removed = store.sweep_older_than(max_age);
    tracing::info!(
        dir = %store.root().display(),
        removed,
        max_age_secs = max_age.as_secs(),
        "Temp directory ready"
    );

    let interval_secs = config.temp_sweep_interval_secs();
    if interval_secs > 0 {
        store
            .clone()
            .spawn_periodic_sweep(Duration::from_secs(interval_secs), max_age);
        tracing::info!(interval_secs, "Periodic temp sweep enabled");
    }

    Ok(store)
}
