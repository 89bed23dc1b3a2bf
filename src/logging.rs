//! Process-wide logging setup.
//!
//! Logging is initialized once in `main` and produces a [`LogGuard`]. Events go to
//! stdout and are appended to a log file through a non-blocking writer; the guard
//! must be kept alive for the lifetime of the process and dropped at shutdown so
//! buffered lines are flushed.

use crate::errors::{Error, Result};
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "chip.log";

/// Keeps the file writer alive. Dropping it flushes pending log lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _worker: WorkerGuard,
}

impl LogGuard {
    /// Flushes and closes the file sink.
    pub fn shutdown(self) {
        info!("Flushing logs and shutting down.");
        drop(self);
    }
}

/// Builds the global subscriber: an `EnvFilter` (default `info`, overridable with
/// `RUST_LOG`), a stdout layer and an append-only file layer at `log_file`.
pub fn init(log_file: &Path) -> Result<LogGuard> {
    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file.file_name().ok_or_else(|| Error::Logging {
        message: format!("{} is not a file path", log_file.display()),
    })?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (file_writer, worker) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .map_err(|e| Error::Logging {
            message: e.to_string(),
        })?;

    Ok(LogGuard { _worker: worker })
}

#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
