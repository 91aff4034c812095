//! Loopback HTTP router — spec.md §6.
//!
//! No auth, no CORS, no body-size limit: the hook bridge and this service
//! are both local to the same machine.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::dispatch::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hooks/PreToolUse", post(dispatch::pre_tool_use))
        .route("/hooks/Stop", post(dispatch::stop_event))
        .route("/hooks/SessionStart", post(dispatch::session_start))
        .route("/hooks/SessionEnd", post(dispatch::session_end))
        .route("/hooks/Notification", post(dispatch::notification))
        .route("/status", get(dispatch::status))
        .fallback(dispatch::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
