//! Tracing setup for the `duet` binary.
//!
//! Everything goes to a daily rolling file under the logs directory;
//! warnings and errors are also echoed to stderr.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,duet_application=debug,duet_core=debug";

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer when dropped and must live
/// until exit. `RUST_LOG` overrides the default filter.
pub fn init(logs_dir: &Path, verbose: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "duet.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_filter = EnvFilter::new(if verbose { "debug" } else { "warn" });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(stderr_filter),
        )
        .init();

    tracing::info!("Logging initialized in {:?}", logs_dir);
    Ok(guard)
}
