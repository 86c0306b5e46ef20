//! In-memory session registry.
//!
//! Maps session ids to records behind a per-session async lock. The map lock
//! is held only long enough to clone the `Arc`; all session work happens under
//! the session's own lock, so different sessions never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::core::{GameError, GameSession, SessionId};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<GameSession>>;

/// Registry of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session. Fails if the id is taken.
    pub fn insert(&self, session: GameSession) -> Result<SessionHandle, GameError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.id) {
            return Err(GameError::SessionAlreadyExists(session.id.to_string()));
        }
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Handle for an id.
    pub fn get(&self, id: &SessionId) -> Result<SessionHandle, GameError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::SessionNotFound(id.to_string()))
    }

    /// Drop a session. Returns its handle if it was registered.
    pub fn delete(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.write().remove(id)
    }

    /// Registered ids.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Is the registry empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Copy of a session's current record.
    pub async fn snapshot(&self, id: &SessionId) -> Result<GameSession, GameError> {
        let handle = self.get(id)?;
        let session = handle.lock().await;
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameRng, PlayerMap, PlayerSlot, SessionConfig};
    use chrono::{DateTime, Utc};

    fn session(id: &str) -> GameSession {
        let players = PlayerMap::from_pair(PlayerSlot::human("a"), PlayerSlot::human("b"));
        let now: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        GameSession::new(SessionId::new(id), SessionConfig::default(), players, GameRng::new(1).state(), now).unwrap()
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let registry = SessionRegistry::new();
        registry.insert(session("one")).unwrap();
        assert!(matches!(
            registry.insert(session("one")),
            Err(GameError::SessionAlreadyExists(_))
        ));

        let snap = registry.snapshot(&SessionId::new("one")).await.unwrap();
        assert_eq!(snap.id, SessionId::new("one"));
        assert_eq!(registry.len(), 1);

        assert!(registry.delete(&SessionId::new("one")).is_some());
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(&SessionId::new("one")),
            Err(GameError::SessionNotFound(_))
        ));
    }
}
