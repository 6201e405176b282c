// src/logging.rs

//! Logging setup for `devloop` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `LOG_LEVEL` environment variable (`info` or `debug`)
//! 3. errors only
//!
//! Logs go to STDERR; the managed program inherits our stdout untouched.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when no CLI level is given.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => level_from_env(std::env::var(LOG_LEVEL_ENV).ok().as_deref()),
    };

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

/// Map the `LOG_LEVEL` value to a level.
///
/// Only `info` and `debug` are recognised; every other value, and an unset
/// variable, leaves the supervisor reporting errors only.
pub fn level_from_env(value: Option<&str>) -> tracing::Level {
    match value.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("info") => tracing::Level::INFO,
        Some("debug") => tracing::Level::DEBUG,
        _ => tracing::Level::ERROR,
    }
}
