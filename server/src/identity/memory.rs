use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{IdentityError, IdentityProvider, Session, SessionChange};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-process identity provider issuing opaque UUID tokens.
///
/// Stands in for a hosted provider during development and in tests.
pub struct MemoryIdentityProvider {
    sessions: Mutex<HashMap<String, Session>>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            sessions: Mutex::new(HashMap::new()),
            changes,
        }
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: Uuid) -> Session {
        let session = Session {
            user_id,
            token: Uuid::new_v4().simple().to_string(),
            issued_at: Utc::now(),
        };
        self.lock_sessions()
            .insert(session.token.clone(), session.clone());
        // No receivers is fine: nobody is following yet.
        let _ = self.changes.send(SessionChange::SignedIn(session.clone()));
        session
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_session(&self, token: &str) -> Result<Option<Session>, IdentityError> {
        Ok(self.lock_sessions().get(token).cloned())
    }

    async fn active_sessions(&self) -> Result<Vec<Session>, IdentityError> {
        Ok(self.lock_sessions().values().cloned().collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        self.lock_sessions()
            .remove(token)
            .ok_or(IdentityError::UnknownSession)?;
        let _ = self.changes.send(SessionChange::SignedOut {
            token: token.to_string(),
        });
        Ok(())
    }
}
