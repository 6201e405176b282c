// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use std::sync::Arc;

use tracing::{debug, error};

use crate::cli::CliArgs;
use crate::engine::Supervisor;
use crate::errors::Result;
use crate::exec::CommandBackend;
use crate::fs::RealFileSystem;
use crate::watch::NotifyEventSource;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - configuration for the current directory
/// - the notify-backed event source
/// - the process backend (build toolchain + managed program)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    debug!(?args, "starting devloop");

    let config = Arc::new(config::from_current_dir()?);
    let backend = CommandBackend::new(Arc::clone(&config));

    let supervisor = Supervisor::new(
        config,
        NotifyEventSource::new(),
        backend,
        Arc::new(RealFileSystem),
    );

    supervisor.run(ctrl_c()).await
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves,
/// leaving the supervisor to run until it is killed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
