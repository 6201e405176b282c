// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the binary produced by the build and run as the managed child.
pub const DEFAULT_BINARY_NAME: &str = "runner";

/// Directory whose whole subtree is never watched.
pub const DEFAULT_IGNORED_DIR: &str = ".git";

/// Window used to coalesce watcher restarts.
///
/// Effectively "next scheduler tick": directory churn usually arrives as a
/// burst of events within the same instant.
pub const DEFAULT_RESTART_DEBOUNCE: Duration = Duration::from_micros(500);

/// Window used to coalesce rebuilds. Much longer than the restart window so
/// an editor's save storm collapses into one build.
pub const DEFAULT_BUILD_DEBOUNCE: Duration = Duration::from_secs(2);

/// Toolchain invoked as `<program> build -o <binary> .`.
pub const DEFAULT_BUILD_PROGRAM: &str = "go";

/// Grace period between SIGTERM and a forced kill of the managed child.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Unvalidated configuration.
///
/// Built by [`crate::config::loader`] (or by hand in tests) and turned into a
/// [`SupervisorConfig`] through `TryFrom`, which enforces the invariants.
#[derive(Debug, Clone)]
pub struct RawSupervisorConfig {
    pub root: PathBuf,
    pub binary_name: String,
    pub ignored_dir: String,
    pub restart_debounce: Duration,
    pub build_debounce: Duration,
    pub build_program: String,
    /// `None` waits forever for the child to exit after SIGTERM.
    pub stop_timeout: Option<Duration>,
}

impl RawSupervisorConfig {
    /// The fixed constants, rooted at `root`.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            ignored_dir: DEFAULT_IGNORED_DIR.to_string(),
            restart_debounce: DEFAULT_RESTART_DEBOUNCE,
            build_debounce: DEFAULT_BUILD_DEBOUNCE,
            build_program: DEFAULT_BUILD_PROGRAM.to_string(),
            stop_timeout: Some(DEFAULT_STOP_TIMEOUT),
        }
    }
}

/// Validated, immutable supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    root: PathBuf,
    binary_name: String,
    ignored_dir: String,
    restart_debounce: Duration,
    build_debounce: Duration,
    build_program: String,
    stop_timeout: Option<Duration>,
}

impl SupervisorConfig {
    /// Only called from `validate` once every invariant holds.
    pub(crate) fn new_unchecked(raw: RawSupervisorConfig) -> Self {
        Self {
            root: raw.root,
            binary_name: raw.binary_name,
            ignored_dir: raw.ignored_dir,
            restart_debounce: raw.restart_debounce,
            build_debounce: raw.build_debounce,
            build_program: raw.build_program,
            stop_timeout: raw.stop_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<binary_name>`: the build output and the program we run.
    pub fn binary_path(&self) -> PathBuf {
        self.root.join(&self.binary_name)
    }

    pub fn ignored_dir(&self) -> &str {
        &self.ignored_dir
    }

    pub fn restart_debounce(&self) -> Duration {
        self.restart_debounce
    }

    pub fn build_debounce(&self) -> Duration {
        self.build_debounce
    }

    pub fn build_program(&self) -> &str {
        &self.build_program
    }

    /// Arguments passed to [`Self::build_program`].
    pub fn build_args(&self) -> Vec<String> {
        vec![
            "build".to_string(),
            "-o".to_string(),
            self.binary_name.clone(),
            ".".to_string(),
        ]
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout
    }
}
