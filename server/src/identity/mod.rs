//! Sessions are owned by an external identity provider. The server keeps a
//! read-only projection of them, written by a single follower task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod extract;
pub mod memory;

pub use extract::{AuthenticatedUser, BearerToken, Viewer};
pub use memory::MemoryIdentityProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn(Session),
    SignedOut { token: String },
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("unknown session")]
    UnknownSession,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_session(&self, token: &str) -> Result<Option<Session>, IdentityError>;

    /// Sessions live at the time of the call; seeds a fresh projection.
    async fn active_sessions(&self) -> Result<Vec<Session>, IdentityError>;

    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;
}

/// Process-wide, many-reader view of the provider's sessions keyed by token.
#[derive(Clone, Default)]
pub struct SessionProjection {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionProjection {
    /// Seeds the projection from the provider and spawns the only task allowed
    /// to mutate it afterwards.
    pub async fn follow(
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<(Self, JoinHandle<()>), IdentityError> {
        // Subscribe before the snapshot so no change falls between the two.
        let mut changes = provider.subscribe();
        let snapshot = provider.active_sessions().await?;

        let projection = Self::default();
        {
            let mut sessions = projection.sessions.write().await;
            for session in snapshot {
                sessions.insert(session.token.clone(), session);
            }
            info!(sessions = sessions.len(), "Session projection seeded");
        }

        let writer = projection.clone();
        let handle = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => writer.apply(change).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Session projection lagged; resyncing");
                        match provider.active_sessions().await {
                            Ok(snapshot) => writer.replace(snapshot).await,
                            Err(e) => warn!(error = %e, "Session resync failed"),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Identity provider closed its notification channel");
                        break;
                    }
                }
            }
        });

        Ok((projection, handle))
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn apply(&self, change: SessionChange) {
        let mut sessions = self.sessions.write().await;
        match change {
            SessionChange::SignedIn(session) => {
                debug!(user_id = %session.user_id, "Session signed in");
                sessions.insert(session.token.clone(), session);
            }
            SessionChange::SignedOut { token } => {
                if let Some(session) = sessions.remove(&token) {
                    debug!(user_id = %session.user_id, "Session signed out");
                }
            }
        }
    }

    async fn replace(&self, snapshot: Vec<Session>) {
        let mut sessions = self.sessions.write().await;
        sessions.clear();
        for session in snapshot {
            sessions.insert(session.token.clone(), session);
        }
    }
}
