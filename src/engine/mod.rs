// src/engine/mod.rs

//! Event-coordination engine for devloop.
//!
//! This module ties together:
//! - the debounce timers ([`debounce`])
//! - the watcher lifecycle controller that owns the watch session
//!   ([`watcher`])
//! - the build-and-run controller that owns the managed process
//!   ([`builder`])
//! - the event dispatcher that turns filesystem events into requests
//!   ([`dispatcher`])
//!
//! [`runtime::Supervisor`] wires them up and runs them until shutdown.

pub mod builder;
pub mod debounce;
pub mod dispatcher;
pub mod runtime;
pub mod watcher;

pub use builder::{BuildControl, BuildController};
pub use debounce::Debouncer;
pub use dispatcher::{Dispatch, EventDispatcher, classify};
pub use runtime::Supervisor;
pub use watcher::{RestartHandle, WatcherController};
