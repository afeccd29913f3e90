//! Logging configuration and initialization.

use crate::app::config::AppConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for this process.
///
/// Diagnostics go to stderr so command results on stdout stay clean.
/// `RUST_LOG` overrides the verbosity-derived default filter.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2)
        .init();

    debug!("queuectl started with verbosity level: {}", config.verbose);
}
