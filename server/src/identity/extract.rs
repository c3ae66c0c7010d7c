use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use super::Session;
use crate::state::AppState;
use crate::utils::error::AppError;

/// The request's session, if it carries a live bearer token.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Session>);

/// A signed-in viewer; anonymous requests are rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Session);

/// The raw bearer token, for routes that act on the session itself.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Projection first; the provider covers sessions the follower has not
/// applied yet.
async fn resolve(state: &AppState, token: &str) -> Result<Option<Session>, AppError> {
    if let Some(session) = state.sessions.get(token).await {
        return Ok(Some(session));
    }
    debug!("Session not in projection, asking the identity provider");
    Ok(state.identity.current_session(token).await?)
}

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(Viewer(resolve(state, token).await?)),
            None => Ok(Viewer(None)),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::AuthError("Please sign in to continue".to_string()))?;
        resolve(state, token)
            .await?
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                AppError::AuthError("Your session has expired, please sign in again".to_string())
            })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(|| AppError::AuthError("Please sign in to continue".to_string()))
    }
}
