//! Per-page view controllers.
//!
//! Each controller owns its fetch lifecycle: it enters `Loading` before talking
//! to the store and settles to exactly one of the other states. A controller is
//! built from an explicit [`ViewContext`] and the viewer's session; there is no
//! ambient session state.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use tracing::warn;

use crate::services::{Attendance, EventLifecycle};
use crate::store::EventStore;
use crate::utils::error::AppError;

pub mod dashboard;
pub mod detail;
pub mod events;
pub mod form;
pub mod home;

pub use dashboard::{DashboardModel, DashboardStats, DashboardView};
pub use detail::{DetailModel, EventDetailView};
pub use events::{EventsModel, EventsView};
pub use form::{CreateEventView, EditEventView, EditModel};
pub use home::{HomeModel, HomeView};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    Loading,
    Empty,
    Ready(T),
    NotFound,
    Failed {
        code: &'static str,
        message: String,
        #[serde(skip)]
        status: StatusCode,
    },
}

impl<T> ViewState<T> {
    pub fn failed(err: &AppError) -> Self {
        ViewState::Failed {
            code: err.code(),
            message: err.public_message(),
            status: err.status_code(),
        }
    }

    /// `Empty` for an empty collection, `Ready` otherwise.
    pub fn from_items(items: T) -> Self
    where
        T: AsRef<[crate::presentation::EventCard]>,
    {
        if items.as_ref().is_empty() {
            ViewState::Empty
        } else {
            ViewState::Ready(items)
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }
}

/// Identifies one fetch issued through a [`ViewSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Holds a view's state and drops results from superseded fetches.
pub struct ViewSlot<T> {
    inner: Mutex<(u64, ViewState<T>)>,
}

impl<T: Clone> Default for ViewSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ViewSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new((0, ViewState::Loading)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, (u64, ViewState<T>)> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a fetch: enters `Loading` and supersedes every earlier ticket.
    pub fn begin(&self) -> Ticket {
        let mut inner = self.lock();
        inner.0 += 1;
        inner.1 = ViewState::Loading;
        Ticket(inner.0)
    }

    /// Stores `state` only if `ticket` is still the latest. Returns whether it did.
    pub fn settle(&self, ticket: Ticket, state: ViewState<T>) -> bool {
        let mut inner = self.lock();
        if inner.0 != ticket.0 {
            warn!(
                ticket = ticket.0,
                latest = inner.0,
                "Dropping stale response"
            );
            return false;
        }
        inner.1 = state;
        true
    }

    pub fn current(&self) -> ViewState<T> {
        self.lock().1.clone()
    }

    /// Applies `f` to a `Ready` model in place; other states are left alone.
    pub fn update_ready(&self, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut inner = self.lock();
        match &mut inner.1 {
            ViewState::Ready(model) => {
                f(model);
                Some(model.clone())
            }
            _ => None,
        }
    }

    pub async fn load<F>(&self, fetch: F) -> ViewState<T>
    where
        F: Future<Output = ViewState<T>>,
    {
        let ticket = self.begin();
        let state = fetch.await;
        self.settle(ticket, state);
        self.current()
    }
}

/// Bounds every store fetch a view issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 1,
        }
    }
}

impl FetchPolicy {
    /// Runs `op` under the timeout, retrying only attempts that timed out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => return result,
                Err(_) => warn!(what, attempt, attempts, "Fetch timed out"),
            }
        }
        Err(AppError::Timeout(format!(
            "{what} did not complete after {attempts} attempt(s)"
        )))
    }
}

/// Everything a view controller needs, passed in explicitly.
#[derive(Clone)]
pub struct ViewContext {
    pub store: Arc<dyn EventStore>,
    pub attendance: Attendance,
    pub lifecycle: EventLifecycle,
    pub fetch: FetchPolicy,
    pub featured_limit: usize,
    pub public_base_url: String,
}

impl ViewContext {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            attendance: Attendance::new(store.clone()),
            lifecycle: EventLifecycle::new(store.clone()),
            store,
            fetch: FetchPolicy::default(),
            featured_limit: 6,
            public_base_url: "http://localhost:5173".to_string(),
        }
    }

    pub fn with_fetch_policy(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_featured_limit(mut self, limit: usize) -> Self {
        self.featured_limit = limit;
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_slot_starts_loading() {
        let slot: ViewSlot<u32> = ViewSlot::new();
        assert!(slot.current().is_loading());
    }

    #[test]
    fn test_stale_ticket_does_not_overwrite_newer_result() {
        let slot: ViewSlot<&'static str> = ViewSlot::new();
        let slow = slot.begin();
        let fast = slot.begin();

        assert!(slot.settle(fast, ViewState::Ready("fresh")));
        assert!(!slot.settle(slow, ViewState::Ready("stale")));
        assert_eq!(slot.current(), ViewState::Ready("fresh"));
    }

    #[tokio::test]
    async fn test_interleaved_loads_keep_latest() {
        let slot = Arc::new(ViewSlot::<u32>::new());

        let slow_slot = slot.clone();
        let slow = tokio::spawn(async move {
            slow_slot
                .load(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    ViewState::Ready(1)
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fast = slot.load(async { ViewState::Ready(2) }).await;

        assert_eq!(fast, ViewState::Ready(2));
        assert_eq!(slow.await.unwrap(), ViewState::Ready(2));
        assert_eq!(slot.current(), ViewState::Ready(2));
    }

    #[tokio::test]
    async fn test_fetch_policy_times_out_after_retries() {
        let calls = AtomicU32::new(0);
        let policy = FetchPolicy {
            timeout: Duration::from_millis(10),
            retries: 2,
        };

        let result: Result<(), AppError> = policy
            .run("events", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_policy_retries_only_timeouts() {
        let calls = AtomicU32::new(0);
        let policy = FetchPolicy {
            timeout: Duration::from_millis(50),
            retries: 3,
        };

        let result: Result<(), AppError> = policy
            .run("events", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::NotFound("gone".into())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_state_uses_public_message() {
        let state: ViewState<()> =
            ViewState::failed(&AppError::ExternalServiceError("pg: connection reset".into()));
        match state {
            ViewState::Failed { code, message, status } => {
                assert_eq!(code, "EXTERNAL_SERVICE_ERROR");
                assert!(!message.contains("pg"));
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }
}
