//! Store wrapper that injects faults, for exercising failure paths in tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::{EventQuery, EventStore, MemoryEventStore, StoreError, StoreResult};
use crate::models::{Event, EventFields, Rsvp};

#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryEventStore,
    failing_counts: Mutex<HashSet<Uuid>>,
    fail_rsvp_writes: AtomicBool,
    phantom_rsvps: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_count_for(&self, event_id: Uuid) {
        self.failing_counts.lock().unwrap().insert(event_id);
    }

    pub fn fail_rsvp_writes(&self) {
        self.fail_rsvp_writes.store(true, Ordering::SeqCst);
    }

    /// `get_rsvp` reports an RSVP whether or not one is stored.
    pub fn report_phantom_rsvps(&self) {
        self.phantom_rsvps.store(true, Ordering::SeqCst);
    }

    pub fn delay_listing(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    fn rsvp_write_guard(&self) -> StoreResult<()> {
        if self.fail_rsvp_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FaultyStore {
    async fn list_events(&self, query: EventQuery) -> StoreResult<Vec<Event>> {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.list_events(query).await
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        self.inner.get_event(id).await
    }

    async fn create_event(&self, fields: EventFields, organizer_id: Uuid) -> StoreResult<Event> {
        self.inner.create_event(fields, organizer_id).await
    }

    async fn update_event(
        &self,
        actor: Uuid,
        id: Uuid,
        fields: EventFields,
    ) -> StoreResult<Event> {
        self.inner.update_event(actor, id, fields).await
    }

    async fn delete_event(&self, actor: Uuid, id: Uuid) -> StoreResult<()> {
        self.inner.delete_event(actor, id).await
    }

    async fn count_rsvps(&self, event_id: Uuid) -> StoreResult<u64> {
        if self.failing_counts.lock().unwrap().contains(&event_id) {
            return Err(StoreError::Unavailable("injected count failure".to_string()));
        }
        self.inner.count_rsvps(event_id).await
    }

    async fn get_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Rsvp>> {
        if self.phantom_rsvps.load(Ordering::SeqCst) {
            return Ok(Some(Rsvp {
                event_id,
                user_id,
                created_at: chrono::Utc::now(),
            }));
        }
        self.inner.get_rsvp(event_id, user_id).await
    }

    async fn insert_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.rsvp_write_guard()?;
        self.inner.insert_rsvp(event_id, user_id).await
    }

    async fn delete_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.rsvp_write_guard()?;
        self.inner.delete_rsvp(event_id, user_id).await
    }

    async fn list_rsvp_event_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        self.inner.list_rsvp_event_ids(user_id).await
    }
}
