//! Logging setup for applications embedding agrimap.
//!
//! - Writes to `<dir>/agrimap.log` (cleared at start)
//! - Mirrors everything to stdout
//! - Filtered by `RUST_LOG`, defaulting to `info`
//!
//! Library code only emits `tracing` events; nothing is printed unless the
//! host installs a subscriber, either this one or its own.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "agrimap.log";

/// Keeps the non-blocking file writer alive.
///
/// Dropping the guard flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    path: PathBuf,
}

impl LoggingGuard {
    /// Path of the log file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates `log_dir` if needed and truncates `log_file` inside it.
pub fn prepare_log_file(log_dir: &Path, log_file: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file);
    fs::write(&path, "")?;
    Ok(path)
}

/// Installs the global subscriber: file plus stdout, `EnvFilter` from `RUST_LOG`.
///
/// # Errors
///
/// Fails if the log file cannot be prepared or a global subscriber is
/// already installed.
pub fn init_logging(log_dir: &Path, log_file: &str) -> io::Result<LoggingGuard> {
    let path = prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        path,
    })
}
