use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;

const FALLBACK_DIRECTIVES: &str = "redis=warn,info";

/// Filter for the moderation worker: the configured level everywhere, with
/// the redis driver capped at warn so the result-poll loop does not flood
/// the log at debug.
fn worker_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("{log_level},redis=warn"))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVES))
}

pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = worker_filter(&config.log_level);

    if config.is_production() {
        // Targets stay on in JSON output: reconciler and sweeper events are
        // told apart by target when the log ships to a collector.
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    Ok(())
}
