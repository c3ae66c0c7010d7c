use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::{error, success};
use crate::views::ViewState;

pub mod auth;
pub mod dashboard;
pub mod events;
pub mod pages;

pub use auth::{sign_in, sign_in_disabled, sign_out};
pub use dashboard::dashboard;
pub use events::{
    create_event, delete_event, edit_event_form, get_event, list_events, toggle_rsvp,
    update_event,
};
pub use pages::{home, navbar};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "evently-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Turns a settled view into a response. `Ready` and `Empty` are both 200 with
/// the tagged state as data, so clients render the empty message themselves.
pub(crate) fn render<T: Serialize>(state: ViewState<T>, message: &str) -> Response {
    match state {
        ViewState::Ready(_) | ViewState::Empty => success(state, message),
        ViewState::NotFound => AppError::NotFound("Event not found".to_string()).into_response(),
        ViewState::Failed {
            code,
            message,
            status,
        } => error(code, message, None, status),
        ViewState::Loading => {
            AppError::InternalServerError("view did not settle".to_string()).into_response()
        }
    }
}
