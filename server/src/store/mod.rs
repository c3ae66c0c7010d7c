//! Ports onto the durable event store.
//!
//! The store owns the `events` and `rsvps` relations and their access policy:
//! only an event's organizer may update or delete it, and RSVP rows are written
//! by the attending user only. Callers never rely on their own checks for this.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, EventFields, Rsvp};

pub mod memory;
pub mod postgres;
#[cfg(test)]
pub mod testing;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    #[error("write rejected by access policy")]
    Forbidden,

    #[error("conflicting row: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row filter for [`EventStore::list_events`]. Results are always ordered by
/// `event_date` ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub min_date: Option<DateTime<Utc>>,
    pub organizer_id: Option<Uuid>,
    /// `Some(vec![])` matches nothing.
    pub id_in: Option<Vec<Uuid>>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            min_date: Some(now),
            ..Self::default()
        }
    }

    pub fn organized_by(organizer_id: Uuid) -> Self {
        Self {
            organizer_id: Some(organizer_id),
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, ids: Vec<Uuid>) -> Self {
        self.id_in = Some(ids);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(min_date) = self.min_date {
            if event.event_date < min_date {
                return false;
            }
        }
        if let Some(organizer_id) = self.organizer_id {
            if event.organizer_id != organizer_id {
                return false;
            }
        }
        if let Some(ids) = &self.id_in {
            if !ids.contains(&event.id) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_events(&self, query: EventQuery) -> StoreResult<Vec<Event>>;

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    async fn create_event(&self, fields: EventFields, organizer_id: Uuid) -> StoreResult<Event>;

    /// Rejected with [`StoreError::Forbidden`] unless `actor` organizes the event.
    async fn update_event(&self, actor: Uuid, id: Uuid, fields: EventFields)
        -> StoreResult<Event>;

    /// Rejected with [`StoreError::Forbidden`] unless `actor` organizes the event.
    async fn delete_event(&self, actor: Uuid, id: Uuid) -> StoreResult<()>;

    async fn count_rsvps(&self, event_id: Uuid) -> StoreResult<u64>;

    async fn get_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Rsvp>>;

    async fn insert_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    async fn delete_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    async fn list_rsvp_event_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;
}
