use crate::error::fs::FsError;
use crate::fs::create_file;
use slog::{Drain, Level, Logger};
use std::path::PathBuf;

/// Where log records go.
pub enum LoggingMode {
    /// Compact, colored when attached to a terminal.
    Stderr,

    /// Full records with timestamps, to a file created (or truncated) for this run.
    File(PathBuf),
}

fn create_drain(mode: LoggingMode) -> Result<Logger, FsError> {
    let logger = match mode {
        LoggingMode::Stderr => {
            let decorator = slog_term::TermDecorator::new().stderr().build();
            let drain = slog_term::CompactFormat::new(decorator).build().fuse();
            Logger::root(slog_async::Async::new(drain).build().fuse(), slog::o!())
        }
        LoggingMode::File(out) => {
            let decorator = slog_term::PlainDecorator::new(create_file(&out)?);
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            Logger::root(slog_async::Async::new(drain).build().fuse(), slog::o!())
        }
    };
    Ok(logger)
}

/// Maps a verbosity to a level. `None` silences logging entirely.
pub fn log_level(verbose_level: i64) -> Option<Level> {
    match verbose_level {
        -3 => Some(Level::Critical),
        -2 => Some(Level::Error),
        -1 => Some(Level::Warning),
        0 => Some(Level::Info),
        1 => Some(Level::Debug),
        x if x > 0 => Some(Level::Trace),
        _ => None,
    }
}

/// Root logger for the aggregator and its adapters. Negative verbosity
/// drops warnings, then errors, then everything.
pub fn create_root_logger(verbose_level: i64, mode: LoggingMode) -> Result<Logger, FsError> {
    let Some(level) = log_level(verbose_level) else {
        return Ok(Logger::root(slog::Discard, slog::o!()));
    };
    let drain = slog::LevelFilter::new(create_drain(mode)?, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(Logger::root(
        drain,
        slog::o!("version" => env!("CARGO_PKG_VERSION")),
    ))
}
