use axum::extract::State;
use axum::response::Response;
use chrono::Utc;

use super::render;
use crate::identity::AuthenticatedUser;
use crate::state::AppState;
use crate::views::DashboardView;

pub async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Response {
    let view = DashboardView::new(state.views.clone(), session);
    render(view.load(Utc::now()).await, "Dashboard loaded")
}
