use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    create_event, dashboard, delete_event, edit_event_form, get_event, health_check, home,
    list_events, navbar, sign_in, sign_in_disabled, sign_out, toggle_rsvp, update_event,
};
use crate::state::AppState;

fn api_routes(dev_auth: bool) -> Router<AppState> {
    let session = if dev_auth {
        post(sign_in)
    } else {
        post(sign_in_disabled)
    };

    Router::new()
        .route("/auth/session", session.delete(sign_out))
        .route("/nav", get(navbar))
        .route("/home", get(home))
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/:id/edit", get(edit_event_form))
        .route("/events/:id/rsvp", post(toggle_rsvp))
        .route("/dashboard", get(dashboard))
}

pub fn create_routes(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(config.dev_auth()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(&config))
        .layer(create_cors_layer(&config))
}
