//! Session store: the single writer for conversation state.
//!
//! Holds the session list and the active selection behind one Mutex. Every
//! mutation goes through `update`, a serialized read-modify-write against the
//! latest state, and is persisted before the lock is released. No component
//! holds a divergent copy of message state across an async boundary.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::types::{GeneratedImage, Message, Sender, Session};

use crate::kv::KvStore;

struct Inner {
    sessions: Vec<Session>,
    active_id: Uuid,
}

/// Process-wide session state with explicit init and explicit persistence on
/// every change.
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    inner: Mutex<Inner>,
    default_language: String,
}

impl SessionStore {
    /// Initialize from persisted state, or bootstrap a fresh default session
    /// on first launch.
    pub fn init(kv: Arc<dyn KvStore>, default_language: &str) -> Result<Self> {
        let mut sessions = kv.load_sessions()?.unwrap_or_default();
        if sessions.is_empty() {
            sessions.push(Session::new(default_language));
        }

        let active_id = match kv.load_active_id()? {
            Some(id) if sessions.iter().any(|s| s.id == id) => id,
            _ => sessions[0].id,
        };

        let store = Self {
            kv,
            inner: Mutex::new(Inner {
                sessions,
                active_id,
            }),
            default_language: default_language.to_string(),
        };
        store.persist()?;
        tracing::info!("Session store initialized");
        Ok(store)
    }

    /// All sessions, in creation order.
    pub fn sessions(&self) -> Vec<Session> {
        self.inner.lock().expect("store mutex poisoned").sessions.clone()
    }

    /// Id of the active session.
    pub fn active_id(&self) -> Uuid {
        self.inner.lock().expect("store mutex poisoned").active_id
    }

    /// Snapshot of the active session.
    pub fn active_session(&self) -> Session {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .sessions
            .iter()
            .find(|s| s.id == inner.active_id)
            .cloned()
            .unwrap_or_else(|| Session::new(&self.default_language))
    }

    /// Snapshot of a session by id.
    pub fn session(&self, id: Uuid) -> Option<Session> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.sessions.iter().find(|s| s.id == id).cloned()
    }

    /// Create a new session in the given language and make it active.
    pub fn create_session(&self, language: &str) -> Result<Uuid> {
        let id = {
            let mut inner = self.inner.lock().expect("store mutex poisoned");
            let session = Session::new(language);
            let id = session.id;
            inner.sessions.push(session);
            inner.active_id = id;
            id
        };
        self.persist()?;
        Ok(id)
    }

    /// Delete a session. Falls back to a fresh default session if it was the
    /// last one. Returns the id of the session that is active afterwards.
    pub fn delete_session(&self, id: Uuid) -> Result<Uuid> {
        let active = {
            let mut inner = self.inner.lock().expect("store mutex poisoned");
            let before = inner.sessions.len();
            inner.sessions.retain(|s| s.id != id);
            if inner.sessions.len() == before {
                return Err(WayfarerError::Store(format!("No such session: {}", id)));
            }
            if inner.sessions.is_empty() {
                inner.sessions.push(Session::new(&self.default_language));
            }
            if inner.active_id == id {
                inner.active_id = inner.sessions[0].id;
            }
            inner.active_id
        };
        self.persist()?;
        Ok(active)
    }

    /// Switch the active session.
    pub fn set_active(&self, id: Uuid) -> Result<()> {
        {
            let mut inner = self.inner.lock().expect("store mutex poisoned");
            if !inner.sessions.iter().any(|s| s.id == id) {
                return Err(WayfarerError::Store(format!("No such session: {}", id)));
            }
            inner.active_id = id;
        }
        self.persist()
    }

    /// Serialized update-by-id. All message mutation goes through here.
    ///
    /// Returns `Ok(false)` if the session no longer exists, so a stale
    /// in-flight update against a deleted session lands as a no-op.
    pub fn update<F>(&self, id: Uuid, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Session),
    {
        let found = {
            let mut inner = self.inner.lock().expect("store mutex poisoned");
            match inner.sessions.iter_mut().find(|s| s.id == id) {
                Some(session) => {
                    f(session);
                    session.derive_title();
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist()?;
        } else {
            tracing::debug!(session = %id, "Update dropped: session gone");
        }
        Ok(found)
    }

    /// Append a message to a session.
    pub fn push_message(&self, id: Uuid, message: Message) -> Result<bool> {
        self.update(id, |s| s.messages.push(message))
    }

    /// Mutate one message in place, by session and message id.
    ///
    /// Returns `Ok(false)` if either is gone (the stale-placeholder race).
    pub fn update_message<F>(&self, session_id: Uuid, message_id: u64, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Message),
    {
        let mut touched = false;
        let found = self.update(session_id, |s| {
            if let Some(msg) = s.messages.iter_mut().find(|m| m.id == message_id) {
                f(msg);
                touched = true;
            }
        })?;
        Ok(found && touched)
    }

    /// Change a session's language.
    pub fn set_language(&self, id: Uuid, code: &str) -> Result<bool> {
        let code = code.to_string();
        self.update(id, move |s| s.language = code)
    }

    /// All generated images across all sessions, newest first.
    pub fn gallery(&self) -> Vec<GeneratedImage> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut images: Vec<GeneratedImage> = inner
            .sessions
            .iter()
            .flat_map(|s| {
                s.messages
                    .iter()
                    .filter(|m| m.sender == Sender::Bot)
                    .flat_map(move |m| {
                        m.images.iter().map(move |src| GeneratedImage {
                            src: src.clone(),
                            session_id: s.id,
                            message_id: m.id,
                        })
                    })
            })
            .collect();
        images.sort_by(|a, b| b.message_id.cmp(&a.message_id));
        images
    }

    /// Read a persisted boolean setting (e.g. the text-to-speech toggle).
    pub fn load_setting(&self, key: &str) -> Result<Option<bool>> {
        self.kv.load_bool(key)
    }

    /// Persist a boolean setting.
    pub fn save_setting(&self, key: &str, value: bool) -> Result<()> {
        self.kv.save_bool(key, value)
    }

    fn persist(&self) -> Result<()> {
        let (sessions, active_id) = {
            let inner = self.inner.lock().expect("store mutex poisoned");
            (inner.sessions.clone(), inner.active_id)
        };
        self.kv.save_sessions(&sessions)?;
        self.kv.save_active_id(active_id)
    }
}

// =============================================================================
// Tests
// =============================================================================
