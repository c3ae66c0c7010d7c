use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::Config;
use crate::identity::{IdentityError, IdentityProvider, MemoryIdentityProvider, SessionProjection};
use crate::store::EventStore;
use crate::views::ViewContext;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub views: ViewContext,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: SessionProjection,
    /// Issues development sessions; the same provider as `identity`.
    pub sign_in: Arc<MemoryIdentityProvider>,
}

impl AppState {
    /// Wires the views to `store` and starts the session follower. The returned
    /// handle is the follower task.
    pub async fn build(
        config: Config,
        store: Arc<dyn EventStore>,
        identity: Arc<MemoryIdentityProvider>,
    ) -> Result<(Self, JoinHandle<()>), IdentityError> {
        let provider: Arc<dyn IdentityProvider> = identity.clone();
        let (sessions, follower) = SessionProjection::follow(provider.clone()).await?;

        let views = ViewContext::new(store)
            .with_fetch_policy(config.fetch_policy())
            .with_featured_limit(config.featured_events_limit)
            .with_public_base_url(config.public_base_url.clone());

        let state = Self {
            config: Arc::new(config),
            views,
            identity: provider,
            sessions,
            sign_in: identity,
        };
        Ok((state, follower))
    }
}
