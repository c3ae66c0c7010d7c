use axum::extract::State;
use axum::response::Response;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::identity::{BearerToken, Session};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success};

#[derive(Debug, Serialize)]
pub struct SignInPayload {
    pub token: String,
    #[serde(flatten)]
    pub session: Session,
}

/// Development sign-in against the in-process provider. Every call mints a
/// fresh identity; only mounted when `Config::dev_auth` allows it.
pub async fn sign_in(State(state): State<AppState>) -> Response {
    let session = state.sign_in.sign_in(Uuid::new_v4());
    info!(user_id = %session.user_id, "Signed in");

    created(
        SignInPayload {
            token: session.token.clone(),
            session,
        },
        "Signed in",
    )
}

pub async fn sign_in_disabled() -> AppError {
    AppError::NotFound("Not found".to_string())
}

pub async fn sign_out(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Response, AppError> {
    state.identity.sign_out(&token).await?;
    Ok(empty_success("Signed out"))
}
