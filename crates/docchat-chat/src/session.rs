//! In-memory conversation store keyed by document id.
//!
//! Each session holds its turn history behind its own async mutex so that a
//! read-retrieve-append sequence on one session cannot interleave with
//! another on the same session, while different sessions proceed
//! independently. The map itself is only locked briefly. Sessions live for
//! the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use docchat_core::Turn;

use crate::error::ChatError;

/// Length of a session id (a prefix of a UUID v4 string).
pub const SESSION_ID_LEN: usize = 8;

type History = Arc<Mutex<Vec<Turn>>>;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, History>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an id not currently in use.
    pub fn allocate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string()[..SESSION_ID_LEN].to_string();
            if !self.exists(&id) {
                return id;
            }
        }
    }

    /// Register `id` with an empty history, replacing any existing history.
    pub fn create(&self, id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(id.to_string(), Arc::new(Mutex::new(Vec::new())));
    }

    pub fn exists(&self, id: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn history(&self, id: &str) -> Result<History, ChatError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))
    }

    /// Wait for exclusive access to a session's history.
    pub async fn lock(&self, id: &str) -> Result<SessionGuard, ChatError> {
        let history = self.history(id)?;
        Ok(SessionGuard {
            id: id.to_string(),
            turns: history.lock_owned().await,
        })
    }

    /// Append one turn, waiting for any in-flight exchange on the session.
    pub async fn append(&self, id: &str, turn: Turn) -> Result<(), ChatError> {
        self.lock(id).await?.push(turn);
        Ok(())
    }

    /// Snapshot of a session's turns in arrival order.
    pub async fn get_history(&self, id: &str) -> Result<Vec<Turn>, ChatError> {
        Ok(self.lock(id).await?.turns().to_vec())
    }
}

/// Exclusive handle on one session's history, released on drop.
pub struct SessionGuard {
    id: String,
    turns: OwnedMutexGuard<Vec<Turn>>,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}
