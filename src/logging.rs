//! Logging setup
//!
//! Formats `tracing` events to stderr and, when a directory is configured,
//! to a daily rolling log file. `RUST_LOG` takes precedence over the
//! configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Base name of the rolling log files
pub const LOG_FILE_NAME: &str = "dualsense-link.log";

/// Build the event filter: `RUST_LOG` if set, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber
///
/// # Returns
///
/// * `Option<WorkerGuard>` - keep alive until exit so buffered file output
///   is flushed; `None` when logging to stderr only
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = env_filter(config);
    let stderr = fmt::layer().with_writer(std::io::stderr);

    if config.directory.is_empty() {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .try_init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer().with_ansi(false).with_writer(writer);

    // Fails only when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init();
    Some(guard)
}
