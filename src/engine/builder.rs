// src/engine/builder.rs

//! Build-and-run controller.
//!
//! Owns the managed child. Each time the build debouncer fires it runs one
//! cycle:
//!
//! 1. build; on failure keep the current process and stop here
//! 2. stop the current process and wait for its exit
//! 3. start the new binary
//!
//! Because a single task runs the cycle and step 2 only completes once the
//! old process has exited, two managed processes are never alive at once.

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::errors::{DevloopError, Result};
use crate::exec::{ManagedProcess, ProcessBackend};

/// Out-of-band commands for the build controller.
#[derive(Debug)]
pub(crate) enum BuildCommand {
    /// Stop the managed process (if any), acknowledge, and exit.
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the build controller's control channel.
#[derive(Debug, Clone)]
pub struct BuildControl {
    tx: mpsc::Sender<BuildCommand>,
}

impl BuildControl {
    /// Ask the controller to stop the managed process and wait until it has.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(BuildCommand::Shutdown(ack_tx))
            .await
            .map_err(|_| DevloopError::channel_closed("build control"))?;
        ack_rx
            .await
            .map_err(|_| DevloopError::channel_closed("build shutdown ack"))
    }
}

pub struct BuildController<B: ProcessBackend> {
    backend: B,
    running: Option<B::Process>,
    fire_rx: mpsc::Receiver<()>,
    control_rx: mpsc::Receiver<BuildCommand>,
}

impl<B: ProcessBackend> fmt::Debug for BuildController<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildController")
            .field("running_pid", &self.running.as_ref().map(|p| p.pid()))
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> BuildController<B> {
    /// `fire_rx` is the output of the build debouncer.
    pub fn new(backend: B, fire_rx: mpsc::Receiver<()>) -> (Self, BuildControl) {
        let (tx, control_rx) = mpsc::channel::<BuildCommand>(4);
        let controller = Self {
            backend,
            running: None,
            fire_rx,
            control_rx,
        };
        (controller, BuildControl { tx })
    }

    /// Controller loop.
    ///
    /// Build and process failures are logged and the loop keeps going; only
    /// an error classified as fatal ends it.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                fire = self.fire_rx.recv() => match fire {
                    Some(()) => self.rebuild().await?,
                    None => break,
                },
                cmd = self.control_rx.recv() => match cmd {
                    Some(BuildCommand::Shutdown(ack)) => {
                        self.stop_running().await?;
                        let _ = ack.send(());
                        break;
                    }
                    None => break,
                },
            }
        }

        debug!("build controller finished");
        Ok(())
    }

    async fn rebuild(&mut self) -> Result<()> {
        debug!("building");
        if let Err(err) = self.backend.build().await {
            return absorb(err, "build failed; previous process left running");
        }

        if !self.stop_running().await? {
            return Ok(());
        }

        debug!("running");
        match self.backend.spawn().await {
            Ok(process) => {
                info!(pid = process.pid(), "process started");
                self.running = Some(process);
                Ok(())
            }
            Err(err) => absorb(err, "failed to start new process"),
        }
    }

    /// Stop the managed process, if any. Returns `false` when stopping failed
    /// and the cycle must not start a replacement.
    async fn stop_running(&mut self) -> Result<bool> {
        let Some(process) = self.running.take() else {
            return Ok(true);
        };

        let pid = process.pid();
        debug!(pid, "killing process");
        match self.backend.stop(process).await {
            Ok(()) => {
                info!(pid, "process killed");
                Ok(true)
            }
            Err(err) => {
                absorb(err, "failed to stop previous process; not starting a new one")?;
                Ok(false)
            }
        }
    }
}

/// Log a recoverable error, pass a fatal one through.
fn absorb(err: DevloopError, what: &str) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }
    error!(error = %err, "{what}");
    Ok(())
}
