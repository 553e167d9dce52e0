use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs the process-wide subscriber. Library crates only emit events;
/// binaries call this once at startup. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
