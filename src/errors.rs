// src/errors.rs

//! Crate-wide error type.
//!
//! Every failure the supervisor can hit is a variant of [`DevloopError`], and
//! each variant knows whether it is fatal ([`DevloopError::is_fatal`]).
//! Fatal errors unwind to `main` and terminate the process; the rest are
//! logged by the controller that produced them and the loop stays live.
//!
//! Variants that can end a running supervisor carry a stack captured where
//! they were raised, so `main` can print it. Build them through the
//! constructors ([`DevloopError::walk`], [`DevloopError::event_source`], ...).

use std::backtrace::Backtrace;
use std::path::PathBuf;

use thiserror::Error;

// Alias so thiserror's name-based detection does not treat these fields as
// `provide()` backtraces, which requires nightly `error_generic_member_access`.
type Stack = Backtrace;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("failed to create filesystem watcher: {source}")]
    WatchInit {
        #[source]
        source: notify::Error,
        backtrace: Stack,
    },

    #[error("failed to watch directory {path:?}: {source}")]
    WatchAdd {
        path: PathBuf,
        #[source]
        source: notify::Error,
        backtrace: Stack,
    },

    #[error("failed to walk {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        backtrace: Stack,
    },

    #[error("build failed (exit code {code:?}): {stderr}")]
    BuildFailed { code: Option<i32>, stderr: String },

    #[error("failed to launch build toolchain '{program}': {source}")]
    BuildLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal process {pid}: {source}")]
    ProcessSignal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for process {pid}: {source}")]
    ProcessWait {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {path:?}: {source}")]
    ProcessSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem watch error: {source}")]
    EventSource {
        #[source]
        source: notify::Error,
        backtrace: Stack,
    },

    #[error("internal channel closed: {what}")]
    ChannelClosed {
        what: &'static str,
        backtrace: Stack,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevloopError {
    pub fn watch_init(source: notify::Error) -> Self {
        DevloopError::WatchInit {
            source,
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn watch_add(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        DevloopError::WatchAdd {
            path: path.into(),
            source,
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn walk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DevloopError::Walk {
            path: path.into(),
            source,
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn event_source(source: notify::Error) -> Self {
        DevloopError::EventSource {
            source,
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn channel_closed(what: &'static str) -> Self {
        DevloopError::ChannelClosed {
            what,
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Stack captured where the error was raised, if this variant records one.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            DevloopError::WatchInit { backtrace, .. }
            | DevloopError::WatchAdd { backtrace, .. }
            | DevloopError::Walk { backtrace, .. }
            | DevloopError::EventSource { backtrace, .. }
            | DevloopError::ChannelClosed { backtrace, .. } => Some(backtrace),
            _ => None,
        }
    }

    /// Whether this error must terminate the supervisor.
    ///
    /// Build and process errors are confined to one rebuild cycle; everything
    /// touching the watch session, configuration or internal plumbing is not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DevloopError::BuildFailed { .. }
                | DevloopError::BuildLaunch { .. }
                | DevloopError::ProcessSignal { .. }
                | DevloopError::ProcessWait { .. }
                | DevloopError::ProcessSpawn { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DevloopError>;
