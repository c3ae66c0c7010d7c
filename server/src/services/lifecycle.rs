//! Create, edit and delete flows for events.
//!
//! Input is validated here, before any store call. Ownership is checked by the
//! store itself; nothing in this module assumes the caller is the organizer.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::models::{Category, Event, EventFields};
use crate::store::EventStore;
use crate::utils::error::AppError;

const TITLE_LEN: (usize, usize) = (3, 100);
const DESCRIPTION_LEN: (usize, usize) = (10, 1000);
const LOCATION_LEN: (usize, usize) = (3, 200);

/// Raw form input, as submitted by the create and edit pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub event_date: String,
    pub location: String,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<&Event> for EventForm {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            event_date: event.event_date.to_rfc3339(),
            location: event.location.clone(),
            category: event.category.to_string(),
            image_url: event.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// Creation: the date must be strictly later than this instant.
    After(DateTime<Utc>),
    /// Editing: historical dates are allowed.
    Any,
}

fn check_length(value: &str, field: &str, (min, max): (usize, usize)) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min {
        return Err(AppError::ValidationError(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(AppError::ValidationError(format!(
            "{field} must be less than {max} characters"
        )));
    }
    Ok(())
}

/// Accepts RFC 3339, a `datetime-local` value or a bare date. Values without
/// an offset are taken as UTC.
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

/// Validates a form field by field, returning the first failure.
pub fn validate(form: &EventForm, dates: DateRule) -> Result<EventFields, AppError> {
    let title = form.title.trim();
    check_length(title, "Title", TITLE_LEN)?;

    let description = form.description.trim();
    check_length(description, "Description", DESCRIPTION_LEN)?;

    let event_date = parse_event_date(&form.event_date)
        .ok_or_else(|| AppError::ValidationError("Event date is invalid".to_string()))?;
    if let DateRule::After(now) = dates {
        if event_date <= now {
            return Err(AppError::ValidationError(
                "Event date must be in the future".to_string(),
            ));
        }
    }

    let location = form.location.trim();
    check_length(location, "Location", LOCATION_LEN)?;

    let category: Category = form
        .category
        .parse()
        .map_err(|_| AppError::ValidationError("Invalid category".to_string()))?;

    let image_url = match form.image_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(url) if is_http_url(url) => Some(url.to_string()),
        Some(_) => {
            return Err(AppError::ValidationError(
                "Image URL must be a valid http(s) URL".to_string(),
            ))
        }
    };

    Ok(EventFields {
        title: title.to_string(),
        description: description.to_string(),
        location: location.to_string(),
        event_date,
        category,
        image_url,
    })
}

/// Where the client should go after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub location: String,
}

impl Redirect {
    pub fn to_event(id: Uuid) -> Self {
        Self {
            location: format!("/events/{id}"),
        }
    }

    pub fn to_dashboard() -> Self {
        Self {
            location: "/dashboard".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct EventLifecycle {
    store: Arc<dyn EventStore>,
}

impl EventLifecycle {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        organizer_id: Uuid,
        form: &EventForm,
        now: DateTime<Utc>,
    ) -> Result<(Event, Redirect), AppError> {
        let fields = validate(form, DateRule::After(now))?;
        let event = self.store.create_event(fields, organizer_id).await?;
        info!(event_id = %event.id, %organizer_id, "Event created");
        let redirect = Redirect::to_event(event.id);
        Ok((event, redirect))
    }

    pub async fn load(&self, id: Uuid) -> Result<Event, AppError> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn update(
        &self,
        actor: Uuid,
        id: Uuid,
        form: &EventForm,
    ) -> Result<(Event, Redirect), AppError> {
        let fields = validate(form, DateRule::Any)?;
        let event = self.store.update_event(actor, id, fields).await?;
        info!(event_id = %id, %actor, "Event updated");
        Ok((event, Redirect::to_event(id)))
    }

    /// Irreversible; refuses to run without explicit confirmation.
    pub async fn delete(&self, actor: Uuid, id: Uuid, confirmed: bool) -> Result<Redirect, AppError> {
        if !confirmed {
            return Err(AppError::ValidationError(
                "Please confirm that you want to delete this event".to_string(),
            ));
        }
        self.store.delete_event(actor, id).await?;
        info!(event_id = %id, %actor, "Event deleted");
        Ok(Redirect::to_dashboard())
    }
}
