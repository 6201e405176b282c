// src/engine/debounce.rs

//! "Last request wins" debounce timer.
//!
//! A [`Debouncer`] runs on its own task. Every request re-arms a single
//! deadline `window` in the future; when the deadline passes without a newer
//! request, one fire notification is sent to the owner of the debounced
//! action. Requests never wait for the action itself.
//!
//! The fire channel is expected to have capacity 1: if the owner is still
//! busy with a previous fire, a second one is dropped because an equivalent
//! notification is already pending.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::errors::{DevloopError, Result};

/// Cheap, cloneable handle used to request the debounced action.
#[derive(Debug, Clone)]
pub struct Debouncer {
    label: &'static str,
    tx: mpsc::Sender<()>,
}

impl Debouncer {
    /// Spawn the timer task. `label` only appears in logs and errors.
    pub fn spawn(label: &'static str, window: Duration, fire_tx: mpsc::Sender<()>) -> Self {
        let (tx, rx) = mpsc::channel::<()>(64);
        tokio::spawn(run_timer(label, window, rx, fire_tx));
        Self { label, tx }
    }

    /// Arm (or re-arm) the timer.
    pub async fn request(&self) -> Result<()> {
        self.tx
            .send(())
            .await
            .map_err(|_| DevloopError::channel_closed(self.label))
    }
}

async fn run_timer(
    label: &'static str,
    window: Duration,
    mut rx: mpsc::Receiver<()>,
    fire_tx: mpsc::Sender<()>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            req = rx.recv() => match req {
                Some(()) => {
                    if deadline.is_some() {
                        debug!(timer = label, "replacing timer");
                    }
                    deadline = Some(Instant::now() + window);
                }
                None => break,
            },
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                match fire_tx.try_send(()) {
                    Ok(()) => debug!(timer = label, "timer fired"),
                    Err(TrySendError::Full(())) => {
                        debug!(timer = label, "fire already pending; coalescing");
                    }
                    Err(TrySendError::Closed(())) => break,
                }
            }
        }
    }

    debug!(timer = label, "debounce timer finished");
}
