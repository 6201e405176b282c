// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs the build toolchain and manages the built program as an
//! OS process, using `tokio::process::Command`.
//!
//! - [`backend`] provides the `ProcessBackend` trait the build controller
//!   talks to, and the production `CommandBackend`. Tests swap in a fake that
//!   records the build/stop/spawn sequence instead of running anything.
//! - [`process`] holds the graceful-termination helper (SIGTERM, grace
//!   period, forced kill).

pub mod backend;
pub mod process;

pub use backend::{BoxFuture, CommandBackend, ManagedProcess, ProcessBackend, RunningProcess};
pub use process::terminate_and_wait;
