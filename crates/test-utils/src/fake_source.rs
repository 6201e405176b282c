use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use devloop::watch::{DirectoryWatch, EventSource, FsEvent, Session, SessionId, SessionStreams};

#[derive(Debug)]
struct FakeSession {
    id: SessionId,
    registered: Vec<PathBuf>,
    // `None` once the session's watch handle has been dropped.
    events: Option<mpsc::UnboundedSender<FsEvent>>,
    errors: Option<mpsc::UnboundedSender<notify::Error>>,
}

#[derive(Debug, Default)]
struct FakeSourceState {
    sessions: Vec<FakeSession>,
    fail_create: bool,
    fail_add: Option<PathBuf>,
}

/// An event source that:
/// - records every session it creates and the directories registered on it
/// - lets the test inject events and errors into the newest live session
/// - closes a session's streams when its watch handle is dropped, like the
///   real watcher does.
///
/// Clones share state, so keep one clone in the test and hand the other to
/// the code under test.
#[derive(Debug, Clone, Default)]
pub struct FakeEventSource {
    state: Arc<Mutex<FakeSourceState>>,
}

impl FakeEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `create` fail.
    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    /// Make registration of `path` fail.
    pub fn fail_add_on(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().fail_add = Some(path.into());
    }

    pub fn sessions_created(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// Sessions whose watch handle is still alive.
    pub fn live_sessions(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .filter(|s| s.events.is_some())
            .count()
    }

    /// Directories registered on session `id`, in registration order.
    pub fn registered(&self, id: SessionId) -> Vec<PathBuf> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.registered.clone())
            .unwrap_or_default()
    }

    pub fn latest_id(&self) -> Option<SessionId> {
        self.state.lock().unwrap().sessions.last().map(|s| s.id)
    }

    /// Send an event through the newest session. Returns `false` if there is
    /// no live session to carry it.
    pub fn emit(&self, event: FsEvent) -> bool {
        let state = self.state.lock().unwrap();
        match state.sessions.last().and_then(|s| s.events.as_ref()) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Report a watch error through the newest session.
    pub fn emit_error(&self, err: notify::Error) -> bool {
        let state = self.state.lock().unwrap();
        match state.sessions.last().and_then(|s| s.errors.as_ref()) {
            Some(tx) => tx.send(err).is_ok(),
            None => false,
        }
    }
}

impl EventSource for FakeEventSource {
    fn create(&mut self, id: SessionId) -> notify::Result<Session> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(notify::Error::generic("injected create failure"));
        }

        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();
        state.sessions.push(FakeSession {
            id,
            registered: Vec::new(),
            events: Some(event_tx),
            errors: Some(error_tx),
        });

        Ok(Session {
            id,
            watch: Box::new(FakeWatch {
                id,
                state: Arc::clone(&self.state),
            }),
            streams: SessionStreams { id, events, errors },
        })
    }
}

struct FakeWatch {
    id: SessionId,
    state: Arc<Mutex<FakeSourceState>>,
}

impl DirectoryWatch for FakeWatch {
    fn add_path(&mut self, path: &Path) -> notify::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_add.as_deref() == Some(path) {
            return Err(notify::Error::path_not_found().add_path(path.to_path_buf()));
        }
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == self.id) {
            session.registered.push(path.to_path_buf());
        }
        Ok(())
    }
}

impl Drop for FakeWatch {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(session) = state.sessions.iter_mut().find(|s| s.id == self.id) {
                session.events = None;
                session.errors = None;
            }
        }
    }
}
