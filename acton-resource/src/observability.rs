//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install the JSON tracing subscriber
///
/// The filter comes from `service.log_level`; an unparsable level falls back
/// to `info`. A subscriber installed earlier (for example by a test harness)
/// is left in place.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = build_filter(&config.service.log_level);

    if let Err(e) = tracing_subscriber::fmt().json().with_env_filter(filter).try_init() {
        tracing::debug!("Tracing subscriber already installed: {}", e);
        return Ok(());
    }

    tracing::info!("Tracing initialized for service: {}", config.service.name);

    Ok(())
}

/// Flush logging before exit
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}
