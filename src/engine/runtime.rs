// src/engine/runtime.rs

//! Supervisor runtime.
//!
//! Spawns one task per controller, issues the startup requests and waits
//! for either the shutdown signal or the first controller to give up.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use crate::config::SupervisorConfig;
use crate::errors::{DevloopError, Result};
use crate::exec::ProcessBackend;
use crate::fs::FileSystem;
use crate::watch::{EventSource, SessionStreams};

use super::builder::BuildController;
use super::debounce::Debouncer;
use super::dispatcher::EventDispatcher;
use super::watcher::WatcherController;

/// Wires the controllers together and drives them until shutdown or a fatal
/// error.
///
/// Each controller runs on its own Tokio task and owns its state; they only
/// talk through channels:
///
/// - dispatcher → build debouncer → build controller
/// - dispatcher → watcher controller → (new session streams) → dispatcher
pub struct Supervisor<S: EventSource, B: ProcessBackend> {
    config: Arc<SupervisorConfig>,
    source: S,
    backend: B,
    fs: Arc<dyn FileSystem>,
}

impl<S: EventSource, B: ProcessBackend> fmt::Debug for Supervisor<S, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: EventSource, B: ProcessBackend> Supervisor<S, B> {
    pub fn new(
        config: Arc<SupervisorConfig>,
        source: S,
        backend: B,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            config,
            source,
            backend,
            fs,
        }
    }

    /// Run until `shutdown` resolves (returns `Ok` after stopping the
    /// managed process) or a controller fails fatally (returns that error;
    /// the managed process is left as is).
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            source,
            backend,
            fs,
        } = self;

        info!(pid = std::process::id(), "main process");
        info!(root = ?config.root(), "directory");

        let (streams_tx, streams_rx) = mpsc::channel::<SessionStreams>(4);
        let (watcher, restart) = WatcherController::new(Arc::clone(&config), source, fs, streams_tx);

        let (build_fire_tx, build_fire_rx) = mpsc::channel::<()>(1);
        let build = Debouncer::spawn("build", config.build_debounce(), build_fire_tx);
        let (builder, build_control) = BuildController::new(backend, build_fire_rx);

        let dispatcher = EventDispatcher::new(
            config.binary_path(),
            build.clone(),
            restart.clone(),
            streams_rx,
        );

        let mut watcher_task = tokio::spawn(watcher.run());
        let mut builder_task = tokio::spawn(builder.run());
        let mut dispatcher_task = tokio::spawn(dispatcher.run());

        // First restart creates the session synchronously; the first build
        // goes through the normal debounce window.
        restart.request()?;
        build.request().await?;

        // Upstream tasks first: when the watcher dies the dispatcher follows,
        // and the watcher's error is the one worth reporting.
        let outcome = tokio::select! {
            biased;

            res = &mut watcher_task => task_outcome("watcher controller", res),
            res = &mut dispatcher_task => task_outcome("event dispatcher", res),
            res = &mut builder_task => task_outcome("build controller", res),
            () = shutdown => {
                info!("shutdown requested; stopping managed process");
                build_control.shutdown().await
            }
        };

        abort_all([&watcher_task, &dispatcher_task, &builder_task]);

        if let Err(err) = &outcome {
            debug!(error = %err, "supervisor stopping");
        }
        outcome
    }
}

/// A controller task only returns on its own when something broke.
fn task_outcome(name: &'static str, res: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match res {
        Ok(Ok(())) => Err(DevloopError::channel_closed(name)),
        Ok(Err(err)) => Err(err),
        Err(join_err) => Err(anyhow::anyhow!("{name} task failed: {join_err}").into()),
    }
}

fn abort_all(tasks: [&JoinHandle<Result<()>>; 3]) {
    for task in tasks {
        if !task.is_finished() {
            task.abort();
        }
    }
    debug!("controller tasks stopped");
}
