//! Session and auth-token storage shared by the API client and the views.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dto::{UserId, UserSummary};

/// Signed-in session: bearer token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

impl Session {
    /// Identifier of the signed-in user, when known.
    pub fn viewer(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| user.id)
    }
}

/// Failures while persisting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to write session file `{path}`")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode session")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for the current session.
///
/// `clear` is the global sign-out side effect: it runs whenever any call answers 401.
pub trait SessionStore: Send + Sync {
    fn current(&self) -> Option<Session>;
    fn store(&self, session: Session) -> Result<(), SessionError>;
    fn clear(&self);
    /// Observe sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    /// Bearer token of the current session.
    fn token(&self) -> Option<String> {
        self.current().map(|session| session.token)
    }

    /// Signed-in user id, `None` when anonymous.
    fn viewer(&self) -> Option<UserId> {
        self.current().and_then(|session| session.viewer())
    }
}

/// In-process session store.
pub struct MemorySessionStore {
    tx: watch::Sender<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionStore for MemorySessionStore {
    fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    fn store(&self, session: Session) -> Result<(), SessionError> {
        self.tx.send_replace(Some(session));
        Ok(())
    }

    fn clear(&self) {
        self.tx.send_if_modified(|slot| slot.take().is_some());
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

/// Session store persisted as a small JSON file so a restart keeps the sign-in.
pub struct FileSessionStore {
    path: PathBuf,
    memory: MemorySessionStore,
}

impl FileSessionStore {
    /// Open the store, loading an existing session file when one is present and readable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = read_session(&path);
        Self {
            path,
            memory: MemorySessionStore::new(initial),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn current(&self) -> Option<Session> {
        self.memory.current()
    }

    fn store(&self, session: Session) -> Result<(), SessionError> {
        let encoded =
            serde_json::to_vec_pretty(&session).map_err(|source| SessionError::Encode { source })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SessionError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| SessionError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        self.memory.store(session)
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "session cleared"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to delete session file"
            ),
        }
        self.memory.clear();
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.memory.subscribe()
    }
}

fn read_session(path: &Path) -> Option<Session> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Session>(&contents) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse session file; starting signed out"
                );
                None
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read session file; starting signed out"
            );
            None
        }
    }
}
