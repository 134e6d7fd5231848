//! Tracing subscriber bootstrap.

use lodge_core::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::paths::LodgePaths;

/// Initializes the global tracing subscriber: stderr output filtered by
/// `RUST_LOG` (default `info`), plus a daily-rolling file under the Lodge
/// log directory.
///
/// Returns the appender worker guard; the caller must keep it alive for the
/// lifetime of the process or buffered log lines are lost.
pub fn init() -> Result<WorkerGuard> {
    let log_dir = LodgePaths::log_dir()
        .map_err(|err| lodge_core::LodgeError::config(err.to_string()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "lodge.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    Ok(guard)
}
