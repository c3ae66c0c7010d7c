use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::render;
use crate::identity::{AuthenticatedUser, Viewer};
use crate::services::{CategoryFilter, EventForm};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::views::{CreateEventView, EditEventView, EventDetailView, EventsView, ViewState};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub q: String,
    pub category: Option<String>,
}

impl ListParams {
    fn category(&self) -> Result<CategoryFilter, AppError> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(CategoryFilter::All),
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::ValidationError("Invalid category".to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub confirm: bool,
}

pub async fn list_events(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let category = params.category()?;
    let view = EventsView::new(state.views.clone(), viewer);
    let settled = view.load(Utc::now(), &params.q, category).await;
    Ok(render(settled, "Events loaded"))
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(form): Json<EventForm>,
) -> Result<Response, AppError> {
    let submitted = CreateEventView::new(state.views.clone(), session)
        .submit(&form, Utc::now())
        .await?;
    Ok(created(submitted, "Event created successfully"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(event_id): Path<Uuid>,
) -> Response {
    let view = EventDetailView::new(state.views.clone(), viewer, event_id);
    render(view.load().await, "Event loaded")
}

pub async fn edit_event_form(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
) -> Response {
    let view = EditEventView::new(state.views.clone(), session, event_id);
    render(view.load().await, "Event loaded for editing")
}

pub async fn update_event(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    Json(form): Json<EventForm>,
) -> Result<Response, AppError> {
    let submitted = EditEventView::new(state.views.clone(), session, event_id)
        .submit(&form)
        .await?;
    Ok(success(submitted, "Event updated successfully"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(event_id): Path<Uuid>,
    body: Option<Json<DeleteRequest>>,
) -> Result<Response, AppError> {
    let confirmed = body.map(|Json(r)| r.confirm).unwrap_or(false);
    let redirect = EditEventView::new(state.views.clone(), session, event_id)
        .delete(confirmed)
        .await?;
    Ok(success(redirect, "Event deleted successfully"))
}

/// Anonymous callers are turned away before the event is fetched.
pub async fn toggle_rsvp(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let signed_in = viewer.is_some();
    let view = EventDetailView::new(state.views.clone(), viewer, event_id);

    if signed_in {
        match view.load().await {
            ViewState::Ready(_) => {}
            other => return Ok(render(other, "")),
        }
    }

    let result = view.toggle_rsvp().await?;
    let message = result.message;
    Ok(success(result, message))
}
