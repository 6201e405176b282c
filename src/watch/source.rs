// src/watch/source.rs

//! Event source adapter around `notify`.

use std::fmt;
use std::path::Path;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{FsEvent, FsOp, SessionId};

/// Write side of a watch session: the set of registered directories.
///
/// Registration is not recursive; every directory is added on its own.
pub trait DirectoryWatch: Send {
    fn add_path(&mut self, path: &Path) -> notify::Result<()>;
}

/// Read side of a watch session.
///
/// Both streams end when the session's [`DirectoryWatch`] is dropped.
pub struct SessionStreams {
    pub id: SessionId,
    pub events: mpsc::UnboundedReceiver<FsEvent>,
    pub errors: mpsc::UnboundedReceiver<notify::Error>,
}

impl fmt::Debug for SessionStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStreams")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A freshly created watch session, not yet split between its owners.
pub struct Session {
    pub id: SessionId,
    pub watch: Box<dyn DirectoryWatch>,
    pub streams: SessionStreams,
}

/// Factory for watch sessions.
///
/// Production code uses [`NotifyEventSource`]; tests provide a fake that
/// records registrations and lets them inject events.
pub trait EventSource: Send + 'static {
    fn create(&mut self, id: SessionId) -> notify::Result<Session>;
}

/// OS-native event source (inotify / FSEvents / ReadDirectoryChangesW).
#[derive(Debug, Default)]
pub struct NotifyEventSource;

impl NotifyEventSource {
    pub fn new() -> Self {
        Self
    }
}

struct NotifyWatch {
    inner: RecommendedWatcher,
}

impl DirectoryWatch for NotifyWatch {
    fn add_path(&mut self, path: &Path) -> notify::Result<()> {
        self.inner.watch(path, RecursiveMode::NonRecursive)
    }
}

impl EventSource for NotifyEventSource {
    fn create(&mut self, id: SessionId) -> notify::Result<Session> {
        let (event_tx, events) = mpsc::unbounded_channel::<FsEvent>();
        let (error_tx, errors) = mpsc::unbounded_channel::<notify::Error>();

        // Called synchronously on notify's own thread. Send failures mean the
        // dispatcher has already moved on to a newer session.
        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(err) = lost_events_error(&event) {
                        let _ = error_tx.send(err);
                        return;
                    }
                    for fs_event in translate_event(&event) {
                        if event_tx.send(fs_event).is_err() {
                            trace!(session = id, "event receiver gone; dropping event");
                        }
                    }
                }
                Err(err) => {
                    let _ = error_tx.send(err);
                }
            },
            Config::default(),
        )?;

        debug!(session = id, "created notify watcher");

        Ok(Session {
            id,
            watch: Box::new(NotifyWatch { inner }),
            streams: SessionStreams { id, events, errors },
        })
    }
}

/// Map a `notify` event kind onto our operation set.
///
/// Access notifications and `Other` carry no change and map to `None`.
pub fn op_for_kind(kind: &EventKind) -> Option<FsOp> {
    match kind {
        EventKind::Create(_) => Some(FsOp::Create),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(FsOp::Chmod),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FsOp::Rename),
        EventKind::Modify(_) | EventKind::Any => Some(FsOp::Write),
        EventKind::Remove(_) => Some(FsOp::Remove),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

/// Error for a notification saying events were lost (the kernel queue
/// overflowed and the tree must be rescanned), `None` for any other event.
///
/// Unwatched directories may have appeared in the gap, so the session can no
/// longer be trusted.
pub fn lost_events_error(event: &Event) -> Option<notify::Error> {
    if !event.need_rescan() {
        return None;
    }
    let err = notify::Error::generic("filesystem event queue overflowed; events were lost");
    Some(event.paths.iter().cloned().fold(err, notify::Error::add_path))
}

/// Split one `notify` event into one [`FsEvent`] per affected path.
pub fn translate_event(event: &Event) -> Vec<FsEvent> {
    match op_for_kind(&event.kind) {
        Some(op) => event
            .paths
            .iter()
            .map(|path| FsEvent::new(path.clone(), op))
            .collect(),
        None => Vec::new(),
    }
}
