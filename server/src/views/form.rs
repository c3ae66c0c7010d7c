use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{ViewContext, ViewSlot, ViewState};
use crate::identity::Session;
use crate::models::{Category, Event};
use crate::services::{EventForm, Redirect};
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submitted {
    pub event: Event,
    pub redirect: Redirect,
}

pub struct CreateEventView {
    ctx: ViewContext,
    session: Session,
}

impl CreateEventView {
    pub fn new(ctx: ViewContext, session: Session) -> Self {
        Self { ctx, session }
    }

    pub async fn submit(&self, form: &EventForm, now: DateTime<Utc>) -> Result<Submitted, AppError> {
        let (event, redirect) = self
            .ctx
            .lifecycle
            .create(self.session.user_id, form, now)
            .await?;
        Ok(Submitted { event, redirect })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditModel {
    pub event_id: Uuid,
    pub form: EventForm,
    pub categories: Vec<Category>,
}

/// Edit page. Prefills from the stored event; the category stays an enum value
/// and the store decides whether the viewer may save.
pub struct EditEventView {
    ctx: ViewContext,
    session: Session,
    event_id: Uuid,
    slot: ViewSlot<EditModel>,
}

impl EditEventView {
    pub fn new(ctx: ViewContext, session: Session, event_id: Uuid) -> Self {
        Self {
            ctx,
            session,
            event_id,
            slot: ViewSlot::new(),
        }
    }

    pub fn state(&self) -> ViewState<EditModel> {
        self.slot.current()
    }

    pub async fn load(&self) -> ViewState<EditModel> {
        let ctx = &self.ctx;
        let event_id = self.event_id;
        let user_id = self.session.user_id;

        self.slot
            .load(async {
                let fetched = ctx
                    .fetch
                    .run("event for edit", || async move { ctx.lifecycle.load(event_id).await })
                    .await;

                match fetched {
                    Ok(event) if !event.is_organized_by(user_id) => ViewState::failed(
                        &AppError::Forbidden(format!("{user_id} is not the organizer of {event_id}")),
                    ),
                    Ok(event) => ViewState::Ready(EditModel {
                        event_id,
                        form: EventForm::from(&event),
                        categories: Category::ALL.to_vec(),
                    }),
                    Err(AppError::NotFound(_)) => ViewState::NotFound,
                    Err(e) => ViewState::failed(&e),
                }
            })
            .await
    }

    pub async fn submit(&self, form: &EventForm) -> Result<Submitted, AppError> {
        let (event, redirect) = self
            .ctx
            .lifecycle
            .update(self.session.user_id, self.event_id, form)
            .await?;
        Ok(Submitted { event, redirect })
    }

    pub async fn delete(&self, confirmed: bool) -> Result<Redirect, AppError> {
        self.ctx
            .lifecycle
            .delete(self.session.user_id, self.event_id, confirmed)
            .await
    }
}
