//! Router assembly.
//!
//! The browser UI is an external collaborator; this service only exposes
//! the session API it consumes. CORS is wide open: single-user tool, no
//! credentials.

pub mod sessions;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(sessions::get_session).delete(sessions::reset_session),
        )
        .route("/api/sessions/{id}/setup", post(sessions::complete_setup))
        .route("/api/sessions/{id}/messages", post(sessions::submit_message))
        .route("/api/sessions/{id}/feedback", post(sessions::get_feedback))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
