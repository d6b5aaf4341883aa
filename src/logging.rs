//! Logging for the `dsforge` binary.
//!
//! Every launch appends to its own `<app_root>/logs/dsforge-<utc>.log`.
//! In batch mode the console only shows warnings and errors. The log file
//! always follows `RUST_LOG` (default `info`).

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::LevelFilter, fmt, fmt::time::UtcTime, prelude::*,
};

use crate::app_dirs;

/// Launch logs kept in the log directory.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "dsforge-";
const LOG_FILE_SUFFIX: &str = ".log";
const FILE_NAME_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");
const LINE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// How much of the log reaches stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    /// Everything the env filter lets through.
    Verbose,
    /// Warnings and errors only.
    Quiet,
}

impl Console {
    /// Batch runs keep the console to problems.
    pub fn for_batch(batch: bool) -> Self {
        if batch {
            Console::Quiet
        } else {
            Console::Verbose
        }
    }

    fn level(self) -> LevelFilter {
        match self {
            Console::Verbose => LevelFilter::TRACE,
            Console::Quiet => LevelFilter::WARN,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No log directory: {0}")]
    Dir(#[from] app_dirs::AppDirError),
    #[error("Log file error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install logging: {0}")]
    Install(String),
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(console: Console) -> Result<PathBuf, LoggingError> {
    let log_dir = app_dirs::logs_dir()?;
    let log_name = log_file_name(OffsetDateTime::now_utc())?;
    let log_path = log_dir.join(&log_name);
    if LOG_GUARD.get().is_some() {
        return Ok(log_path);
    }
    prune_logs(&log_dir, MAX_LOG_FILES.saturating_sub(1))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, &log_name));
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::new(LINE_TIME))
        .with_writer(std::io::stdout)
        .with_filter(console.level());
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(UtcTime::new(LINE_TIME))
        .with_writer(file_writer);

    Registry::default()
        .with(file_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))?;
    let _ = LOG_GUARD.set(guard);
    tracing::debug!(path = %log_path.display(), "Logging initialized");
    Ok(log_path)
}

/// Span that tags every record of one dataset build.
pub fn run_span(plugin: &str, dataset: &str) -> Span {
    tracing::info_span!("create", plugin, dataset)
}

fn file_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn log_file_name(at: OffsetDateTime) -> Result<String, LoggingError> {
    let stamp = at
        .to_offset(time::UtcOffset::UTC)
        .format(FILE_NAME_TIME)
        .map_err(|err| LoggingError::Install(err.to_string()))?;
    Ok(format!("{LOG_FILE_PREFIX}{stamp}{LOG_FILE_SUFFIX}"))
}

/// Keep only the `keep` newest launch logs. Names sort chronologically; other
/// files in the directory are left alone.
fn prune_logs(dir: &Path, keep: usize) -> Result<usize, LoggingError> {
    let io_err = |source| LoggingError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_SUFFIX))
        .collect();
    names.sort();
    let excess = names.len().saturating_sub(keep);
    for name in &names[..excess] {
        let path = dir.join(name);
        fs::remove_file(&path).map_err(|source| LoggingError::Io { path, source })?;
    }
    Ok(excess)
}
