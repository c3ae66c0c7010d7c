use serde::Serialize;
use uuid::Uuid;

use super::{ViewContext, ViewSlot, ViewState};
use crate::identity::Session;
use crate::models::Event;
use crate::presentation::card::date_label;
use crate::presentation::{attendees_label, calendar_link, share_link, ShareLink};
use crate::services::{EnrichedEvent, ToggleOutcome};
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailActions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_rsvp: bool,
    pub rsvp_label: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailModel {
    pub event: Event,
    pub date_label: String,
    pub attending_count: Option<u64>,
    pub attendees_label: String,
    pub viewer_is_attending: bool,
    pub is_organizer: bool,
    pub actions: DetailActions,
    pub calendar_link: Option<String>,
    pub share: Option<ShareLink>,
}

impl DetailModel {
    fn build(enriched: EnrichedEvent, viewer: Option<&Session>, base_url: &str) -> Self {
        let is_organizer = viewer.is_some_and(|s| enriched.event.is_organized_by(s.user_id));
        let viewer_is_attending = enriched.viewer_is_attending.unwrap_or(false);
        let event = enriched.event;

        Self {
            date_label: date_label(event.event_date),
            attending_count: enriched.attending_count,
            attendees_label: attendees_label(enriched.attending_count),
            viewer_is_attending,
            is_organizer,
            actions: actions(is_organizer, viewer_is_attending),
            calendar_link: (!is_organizer).then(|| calendar_link(&event)),
            share: (!is_organizer).then(|| share_link(&event, base_url)),
            event,
        }
    }

    fn apply(&mut self, outcome: ToggleOutcome) {
        self.attending_count = self.attending_count.map(|count| outcome.apply(count));
        self.attendees_label = attendees_label(self.attending_count);
        self.viewer_is_attending = outcome.attending;
        self.actions = actions(self.is_organizer, outcome.attending);
    }
}

/// Organizers manage, everyone else RSVPs. Anonymous viewers are offered the
/// RSVP action too and asked to sign in when they use it.
fn actions(is_organizer: bool, attending: bool) -> DetailActions {
    DetailActions {
        can_edit: is_organizer,
        can_delete: is_organizer,
        can_rsvp: !is_organizer,
        rsvp_label: match (is_organizer, attending) {
            (true, _) => None,
            (false, true) => Some("Cancel RSVP"),
            (false, false) => Some("RSVP to Event"),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsvpResult {
    pub outcome: ToggleOutcome,
    pub message: &'static str,
    pub detail: DetailModel,
}

pub struct EventDetailView {
    ctx: ViewContext,
    viewer: Option<Session>,
    event_id: Uuid,
    slot: ViewSlot<DetailModel>,
}

impl EventDetailView {
    pub fn new(ctx: ViewContext, viewer: Option<Session>, event_id: Uuid) -> Self {
        Self {
            ctx,
            viewer,
            event_id,
            slot: ViewSlot::new(),
        }
    }

    pub fn state(&self) -> ViewState<DetailModel> {
        self.slot.current()
    }

    pub async fn load(&self) -> ViewState<DetailModel> {
        let viewer_id = self.viewer.as_ref().map(|s| s.user_id);
        let ctx = &self.ctx;
        let event_id = self.event_id;

        self.slot
            .load(async {
                let fetched = ctx
                    .fetch
                    .run("event detail", || async move {
                        match ctx.store.get_event(event_id).await? {
                            Some(event) => {
                                Ok::<_, AppError>(Some(ctx.attendance.attendance(event, viewer_id).await))
                            }
                            None => Ok(None),
                        }
                    })
                    .await;

                match fetched {
                    Ok(Some(enriched)) => ViewState::Ready(DetailModel::build(
                        enriched,
                        self.viewer.as_ref(),
                        &ctx.public_base_url,
                    )),
                    Ok(None) => ViewState::NotFound,
                    Err(e) => ViewState::failed(&e),
                }
            })
            .await
    }

    /// Toggles the viewer's RSVP and adjusts the displayed count by the
    /// returned delta. On failure the displayed state is left untouched.
    pub async fn toggle_rsvp(&self) -> Result<RsvpResult, AppError> {
        let session = self
            .viewer
            .as_ref()
            .ok_or_else(|| AppError::AuthError("Please sign in to RSVP".to_string()))?;

        let ready = match self.slot.current() {
            ViewState::Ready(model) => model,
            ViewState::NotFound => return Err(AppError::NotFound("Event not found".to_string())),
            _ => {
                return Err(AppError::Conflict(
                    "Event details are not loaded yet".to_string(),
                ))
            }
        };
        if ready.is_organizer {
            return Err(AppError::ValidationError(
                "Organizers cannot RSVP to their own event".to_string(),
            ));
        }

        let outcome = self
            .ctx
            .attendance
            .toggle(self.event_id, session.user_id)
            .await?;

        let detail = self
            .slot
            .update_ready(|model| model.apply(outcome))
            .ok_or_else(|| AppError::Conflict("Event details changed while updating".to_string()))?;

        Ok(RsvpResult {
            outcome,
            message: if outcome.attending {
                "RSVP confirmed! See you there!"
            } else {
                "RSVP cancelled"
            },
            detail,
        })
    }
}
