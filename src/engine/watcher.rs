// src/engine/watcher.rs

//! Watcher lifecycle controller.
//!
//! Owns the active watch session. The first restart request creates a session
//! on the spot; later ones go through the restart debouncer so a burst of
//! directory churn produces one re-registration.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, trace};

use crate::config::SupervisorConfig;
use crate::engine::debounce::Debouncer;
use crate::errors::{DevloopError, Result};
use crate::fs::FileSystem;
use crate::watch::{DirectoryWatch, EventSource, Session, SessionId, SessionStreams};
use crate::watch::spawn_registration;

/// Handle used to ask for a watcher restart.
///
/// Requests never wait: while the controller is busy (creating a session or
/// walking the tree) at most one request stays queued, and further ones
/// fold into it.
#[derive(Debug, Clone)]
pub struct RestartHandle {
    tx: mpsc::Sender<()>,
}

impl RestartHandle {
    /// Wrap the sending side of a restart request channel.
    pub fn new(tx: mpsc::Sender<()>) -> Self {
        Self { tx }
    }

    pub fn request(&self) -> Result<()> {
        match self.tx.try_send(()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(())) => {
                trace!("restart already pending");
                Ok(())
            }
            Err(TrySendError::Closed(())) => Err(DevloopError::channel_closed("watcher restart")),
        }
    }
}

pub struct WatcherController<S: EventSource> {
    config: Arc<SupervisorConfig>,
    source: S,
    fs: Arc<dyn FileSystem>,
    session: Option<Box<dyn DirectoryWatch>>,
    last_id: SessionId,
    request_rx: mpsc::Receiver<()>,
    streams_tx: mpsc::Sender<SessionStreams>,
}

impl<S: EventSource> fmt::Debug for WatcherController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherController")
            .field("session", &self.session.as_ref().map(|_| self.last_id))
            .finish_non_exhaustive()
    }
}

impl<S: EventSource> WatcherController<S> {
    /// Every new session's streams are handed to `streams_tx` before its
    /// directories are registered.
    pub fn new(
        config: Arc<SupervisorConfig>,
        source: S,
        fs: Arc<dyn FileSystem>,
        streams_tx: mpsc::Sender<SessionStreams>,
    ) -> (Self, RestartHandle) {
        let (tx, request_rx) = mpsc::channel::<()>(1);
        let controller = Self {
            config,
            source,
            fs,
            session: None,
            last_id: 0,
            request_rx,
            streams_tx,
        };
        (controller, RestartHandle::new(tx))
    }

    /// Controller loop. Returns only on a fatal error, or `Ok` once every
    /// [`RestartHandle`] has been dropped.
    pub async fn run(mut self) -> Result<()> {
        let (fire_tx, mut fire_rx) = mpsc::channel::<()>(1);
        let debouncer = Debouncer::spawn(
            "watcher restart",
            self.config.restart_debounce(),
            fire_tx,
        );

        loop {
            tokio::select! {
                req = self.request_rx.recv() => match req {
                    Some(()) => {
                        info!("restart called");
                        if self.session.is_none() {
                            info!("starting watcher");
                            self.start_session().await?;
                        } else {
                            debouncer.request().await?;
                        }
                    }
                    None => break,
                },
                Some(()) = fire_rx.recv() => {
                    debug!("restarting watcher");
                    self.start_session().await?;
                }
            }
        }

        debug!("watcher controller finished");
        Ok(())
    }

    /// Replace the current session with a new one and register the tree.
    async fn start_session(&mut self) -> Result<()> {
        let id = self.last_id + 1;
        let Session { watch, streams, .. } =
            self.source.create(id).map_err(DevloopError::watch_init)?;
        self.last_id = id;

        // Dropping the old watch ends its OS subscription and its streams.
        if self.session.take().is_some() {
            debug!(session = id - 1, "discarded previous watch session");
        }

        self.streams_tx
            .send(streams)
            .await
            .map_err(|_| DevloopError::channel_closed("session hand-over"))?;

        let (watch, count) = spawn_registration(
            Arc::clone(&self.fs),
            self.config.root().to_path_buf(),
            self.config.ignored_dir().to_string(),
            watch,
        )
        .await?;

        info!(session = id, directories = count, "watch session ready");
        self.session = Some(watch);
        Ok(())
    }
}
