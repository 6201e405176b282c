// src/engine/dispatcher.rs

//! Event dispatcher: the single consumer of the active session's streams.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::engine::debounce::Debouncer;
use crate::engine::watcher::RestartHandle;
use crate::errors::{DevloopError, Result};
use crate::watch::{FsEvent, SessionStreams};

/// What an event asks of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Our own build output; acting on it would loop forever.
    Ignore,
    /// Content changed: rebuild.
    Rebuild,
    /// The tree may have changed shape: rebuild and re-register directories.
    RebuildAndRestart,
}

/// Classify a single event.
pub fn classify(event: &FsEvent, binary_path: &Path) -> Dispatch {
    if event.path == binary_path {
        Dispatch::Ignore
    } else if event.op.is_structural() {
        Dispatch::RebuildAndRestart
    } else {
        Dispatch::Rebuild
    }
}

#[derive(Debug)]
pub struct EventDispatcher {
    binary_path: PathBuf,
    build: Debouncer,
    restart: RestartHandle,
    sessions: mpsc::Receiver<SessionStreams>,
}

impl EventDispatcher {
    pub fn new(
        binary_path: PathBuf,
        build: Debouncer,
        restart: RestartHandle,
        sessions: mpsc::Receiver<SessionStreams>,
    ) -> Self {
        Self {
            binary_path,
            build,
            restart,
            sessions,
        }
    }

    /// Main loop.
    ///
    /// Suspends until the first session is handed over, then follows
    /// whichever session is newest. Buffered events of a replaced session are
    /// dropped. An error reported by the session ends the loop with
    /// [`DevloopError::EventSource`].
    pub async fn run(mut self) -> Result<()> {
        debug!("waiting for watcher");
        let Some(mut current) = self.sessions.recv().await else {
            return Ok(());
        };
        debug!(session = current.id, "dispatcher attached");

        loop {
            tokio::select! {
                biased;

                next = self.sessions.recv() => match next {
                    Some(streams) => {
                        debug!(old = current.id, new = streams.id, "switching watch session");
                        current = streams;
                    }
                    None => break,
                },
                Some(err) = current.errors.recv() => {
                    return Err(DevloopError::event_source(err));
                }
                event = current.events.recv() => match event {
                    Some(event) => self.dispatch(event).await?,
                    None => {
                        debug!(session = current.id, "session closed; waiting for replacement");
                        match self.sessions.recv().await {
                            Some(streams) => current = streams,
                            None => break,
                        }
                    }
                },
            }
        }

        debug!("event dispatcher finished");
        Ok(())
    }

    async fn dispatch(&self, event: FsEvent) -> Result<()> {
        match classify(&event, &self.binary_path) {
            Dispatch::Ignore => {
                trace!(path = ?event.path, op = %event.op, "ignoring build output");
                Ok(())
            }
            Dispatch::Rebuild => {
                info!(path = ?event.path, "modified file");
                self.build.request().await
            }
            Dispatch::RebuildAndRestart => {
                info!(path = ?event.path, op = %event.op, "event");
                self.build.request().await?;
                self.restart.request()
            }
        }
    }
}
