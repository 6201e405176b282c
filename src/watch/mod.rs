// src/watch/mod.rs

//! Filesystem watching.
//!
//! This module is responsible for:
//! - Wrapping the cross-platform watcher (`notify`) behind the
//!   [`EventSource`] / [`DirectoryWatch`] seam ([`source`]).
//! - Registering every directory of the project tree with a session
//!   ([`registrar`]).
//!
//! It does **not** decide what an event means; the engine's dispatcher turns
//! events into build/restart requests.

use std::fmt;
use std::path::PathBuf;

pub mod registrar;
pub mod source;

pub use registrar::{register_directories, spawn_registration};
pub use source::{
    DirectoryWatch, EventSource, NotifyEventSource, Session, SessionStreams, lost_events_error,
    op_for_kind, translate_event,
};

/// Monotonic identifier of a watch session, for logging.
pub type SessionId = u64;

/// Kind of change reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

impl FsOp {
    /// Only a pure content write leaves the directory structure alone.
    pub fn is_structural(self) -> bool {
        !matches!(self, FsOp::Write)
    }
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FsOp::Create => "CREATE",
            FsOp::Write => "WRITE",
            FsOp::Remove => "REMOVE",
            FsOp::Rename => "RENAME",
            FsOp::Chmod => "CHMOD",
        };
        f.write_str(s)
    }
}

/// A single `(path, operation)` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: FsOp,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: FsOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}
