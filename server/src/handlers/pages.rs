use axum::extract::State;
use axum::response::Response;
use chrono::Utc;

use super::render;
use crate::identity::Viewer;
use crate::presentation::Navbar;
use crate::state::AppState;
use crate::utils::response::success;
use crate::views::HomeView;

pub async fn navbar(Viewer(viewer): Viewer) -> Response {
    success(Navbar::for_viewer(viewer.as_ref()), "Navigation loaded")
}

pub async fn home(State(state): State<AppState>, Viewer(viewer): Viewer) -> Response {
    let view = HomeView::new(state.views.clone(), viewer);
    render(view.load(Utc::now()).await, "Featured events loaded")
}
