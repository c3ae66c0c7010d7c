//! Attendance is never stored. Every read derives it from the RSVP relation.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Event;
use crate::store::{EventStore, StoreError, StoreResult};

/// An event with its read-time attendance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: Event,
    /// `None` when the count lookup for this event failed.
    pub attending_count: Option<u64>,
    /// Only present when a viewer was supplied and the lookup succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_is_attending: Option<bool>,
}

/// Result of an RSVP toggle, applied by the caller to its own projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub attending: bool,
    pub delta: i64,
}

impl ToggleOutcome {
    pub fn apply(&self, count: u64) -> u64 {
        if self.delta >= 0 {
            count.saturating_add(self.delta.unsigned_abs())
        } else {
            count.saturating_sub(self.delta.unsigned_abs())
        }
    }
}

#[derive(Clone)]
pub struct Attendance {
    store: Arc<dyn EventStore>,
}

impl Attendance {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Enriches every event concurrently and returns them in input order once
    /// all lookups have settled. A failed lookup only affects its own event.
    pub async fn enrich(&self, events: Vec<Event>, viewer: Option<Uuid>) -> Vec<EnrichedEvent> {
        let total = events.len();
        let enriched = join_all(
            events
                .into_iter()
                .map(|event| self.attendance(event, viewer)),
        )
        .await;
        debug!(events = total, "Enriched events with attendance");
        enriched
    }

    pub async fn attendance(&self, event: Event, viewer: Option<Uuid>) -> EnrichedEvent {
        let event_id = event.id;
        let membership = async {
            match viewer {
                Some(user_id) => Some(self.store.get_rsvp(event_id, user_id).await),
                None => None,
            }
        };
        let (count, membership) = tokio::join!(self.store.count_rsvps(event_id), membership);

        let attending_count = match count {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(%event_id, error = %e, "RSVP count unavailable");
                None
            }
        };
        let viewer_is_attending = match membership {
            Some(Ok(rsvp)) => Some(rsvp.is_some()),
            Some(Err(e)) => {
                warn!(%event_id, error = %e, "RSVP membership unavailable");
                None
            }
            None => None,
        };

        EnrichedEvent {
            event,
            attending_count,
            viewer_is_attending,
        }
    }

    /// Check-then-act against the store: removes the viewer's RSVP if present,
    /// otherwise adds one. Two concurrent toggles by the same user may both
    /// act; the loser gets a conflict rather than a double-counted delta.
    pub async fn toggle(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<ToggleOutcome> {
        let existing = self.store.get_rsvp(event_id, user_id).await?;

        let outcome = if existing.is_some() {
            self.store
                .delete_rsvp(event_id, user_id)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound => {
                        StoreError::Conflict(format!("RSVP of {user_id} on {event_id} already gone"))
                    }
                    other => other,
                })?;
            ToggleOutcome {
                attending: false,
                delta: -1,
            }
        } else {
            self.store.insert_rsvp(event_id, user_id).await?;
            ToggleOutcome {
                attending: true,
                delta: 1,
            }
        };

        debug!(%event_id, %user_id, attending = outcome.attending, "RSVP toggled");
        Ok(outcome)
    }
}
