//! Session service
//!
//! Sessions are named bundles of `{entries, categories, entryFilter}`.
//! Exactly one is active; its contents live in the working store keys and
//! the active id in the persisted application state. Switching sessions
//! swaps the working keys wholesale.

use serde_json::{json, Value};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{validate_session_shape, ApplicationState, Session};
use crate::store::{keys, KeyedStore};

/// Default name for sessions created without user input
pub const DEFAULT_SESSION_NAME: &str = "Unnamed Session";

/// Service for session lifecycle management
pub struct SessionService<'a> {
    store: &'a KeyedStore,
}

impl<'a> SessionService<'a> {
    /// Create a new session service
    pub fn new(store: &'a KeyedStore) -> Self {
        Self { store }
    }

    /// List all known sessions
    pub fn list(&self) -> Vec<Session> {
        self.store.get(keys::SESSIONS).unwrap_or_default()
    }

    /// Get the currently active session record
    pub fn selected_session(&self) -> Option<Session> {
        let state: ApplicationState = self.store.get(keys::STATE)?;
        let session_id = state.session_id?;
        self.list().into_iter().find(|s| s.id == session_id)
    }

    /// Make `session_id` the active session, swapping the working keys
    ///
    /// No-op when the session is already active. Does not stash the current
    /// working state; use [`switch_session`](Self::switch_session) for that.
    pub fn load_session(&self, session_id: &str) -> LedgerResult<()> {
        let state: ApplicationState = self.store.get(keys::STATE).unwrap_or_default();
        if state.session_id.as_deref() == Some(session_id) {
            return Ok(());
        }
        let session = self
            .list()
            .into_iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| LedgerError::session_not_found(session_id))?;

        self.store.set(keys::ENTRIES, &session.entries)?;
        self.store.set(keys::CATEGORIES, &session.categories)?;
        self.store.set(keys::ENTRY_FILTER, &session.entry_filter)?;
        self.store
            .update(keys::STATE, "sessionId", json!(session.id))?;
        info!(session = %session.name, "Loaded session");
        Ok(())
    }

    /// Stash the working keys back into the active session record
    pub fn stash_active_session(&self) -> LedgerResult<()> {
        let Some(mut session) = self.selected_session() else {
            return Ok(());
        };
        session.entries = self.store.get(keys::ENTRIES).unwrap_or_default();
        session.categories = self.store.get(keys::CATEGORIES).unwrap_or_default();
        session.entry_filter = self.store.get(keys::ENTRY_FILTER).unwrap_or_default();
        self.save_session(session)
    }

    /// Stash the active session, then load another one
    pub fn switch_session(&self, session_id: &str) -> LedgerResult<()> {
        self.stash_active_session()?;
        self.load_session(session_id)
    }

    /// Insert or replace a session record by id
    ///
    /// The prior record with the same id is replaced; duplicate ids never
    /// survive a save.
    pub fn save_session(&self, session: Session) -> LedgerResult<()> {
        if session.id.trim().is_empty() {
            return Err(LedgerError::Validation("Session id cannot be empty".into()));
        }
        let mut sessions = self.list();
        sessions.retain(|s| s.id != session.id);
        sessions.push(session);
        self.store.set(keys::SESSIONS, &sessions)
    }

    /// Create and register a new empty session
    pub fn add_empty_session(&self, name: &str) -> LedgerResult<Session> {
        let name = name.trim();
        let session = Session::new(if name.is_empty() {
            DEFAULT_SESSION_NAME
        } else {
            name
        });
        self.save_session(session.clone())?;
        Ok(session)
    }

    /// Rename an existing session
    pub fn rename_session(&self, session_id: &str, new_name: &str) -> LedgerResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(LedgerError::Validation(
                "Session name cannot be empty".into(),
            ));
        }
        let mut session = self
            .list()
            .into_iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| LedgerError::session_not_found(session_id))?;
        session.name = new_name.to_string();
        self.save_session(session)
    }

    /// Delete a session by id
    ///
    /// Deleting the last remaining session leaves the store in a defined
    /// state: one fresh empty session is created and loaded. Deleting the
    /// active session activates the first remaining one.
    pub fn delete_session(&self, session_id: &str) -> LedgerResult<()> {
        let mut sessions = self.list();
        let before = sessions.len();
        sessions.retain(|s| s.id != session_id);
        if sessions.len() == before {
            return Err(LedgerError::session_not_found(session_id));
        }

        if sessions.is_empty() {
            sessions.push(Session::new(DEFAULT_SESSION_NAME));
        }
        self.store.set(keys::SESSIONS, &sessions)?;

        let state: ApplicationState = self.store.get(keys::STATE).unwrap_or_default();
        let active_deleted = state.session_id.as_deref() == Some(session_id);
        if active_deleted || state.session_id.is_none() {
            let first_id = sessions[0].id.clone();
            self.load_session(&first_id)?;
        }
        Ok(())
    }

    /// Serialize the active session (including unsaved working state) for
    /// download
    pub fn export_session(&self) -> LedgerResult<String> {
        self.stash_active_session()?;
        let session = self
            .selected_session()
            .ok_or(LedgerError::Missing("selected session"))?;
        Ok(serde_json::to_string_pretty(&session)?)
    }

    /// Deserialize, validate, register and load a session bundle
    ///
    /// Nothing is overwritten before the bundle passes the shape guard, so a
    /// bad file never loses previously imported data.
    pub fn import_session(&self, json_text: &str) -> LedgerResult<Session> {
        let candidate: Value = serde_json::from_str(json_text)
            .map_err(|e| LedgerError::Validation(format!("Invalid session file: {}", e)))?;
        if !validate_session_shape(&candidate) {
            return Err(LedgerError::Validation(
                "Session file has an unexpected shape".into(),
            ));
        }
        let session: Session = serde_json::from_value(candidate)
            .map_err(|e| LedgerError::Validation(format!("Invalid session file: {}", e)))?;

        self.stash_active_session()?;
        self.save_session(session.clone())?;
        self.load_session(&session.id)?;
        Ok(session)
    }

    /// Guarantee at least one session exists and is active
    ///
    /// First-start initialization; also the fallback subscribers use when
    /// the session list empties out.
    pub fn ensure_session(&self) -> LedgerResult<Session> {
        if let Some(session) = self.selected_session() {
            return Ok(session);
        }
        if let Some(first) = self.list().first() {
            let id = first.id.clone();
            self.load_session(&id)?;
        } else {
            let session = self.add_empty_session(DEFAULT_SESSION_NAME)?;
            self.load_session(&session.id)?;
        }
        self.selected_session()
            .ok_or(LedgerError::Missing("selected session"))
    }
}
