//! Routes one parsed hook event body to its pipeline and serialises the
//! pipeline's response — spec.md §6.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, http::StatusCode};
use serde_json::Value;
use std::sync::Arc;

use crate::pipeline::{lifecycle, pretool, stop, types::{LifecycleEvent, PreToolEvent, StopEvent}, PipelineDeps};

pub type AppState = Arc<PipelineDeps>;

pub async fn pre_tool_use(State(deps): State<AppState>, Json(event): Json<PreToolEvent>) -> impl IntoResponse {
    let response = pretool::handle(&deps, event).await;
    Json(serde_json::to_value(response).unwrap_or_else(|_| Value::Null))
}

pub async fn stop_event(State(deps): State<AppState>, Json(event): Json<StopEvent>) -> impl IntoResponse {
    let response = stop::handle(&deps, event).await;
    Json(serde_json::to_value(response).unwrap_or_else(|_| Value::Null))
}

pub async fn session_start(State(deps): State<AppState>, Json(event): Json<LifecycleEvent>) -> impl IntoResponse {
    Json(lifecycle::session_start(&deps, event).await)
}

pub async fn session_end(State(deps): State<AppState>, Json(event): Json<LifecycleEvent>) -> impl IntoResponse {
    Json(lifecycle::session_end(&deps, event).await)
}

pub async fn notification(State(deps): State<AppState>, Json(event): Json<LifecycleEvent>) -> impl IntoResponse {
    Json(lifecycle::notification(&deps, event).await)
}

pub async fn status(State(deps): State<AppState>) -> impl IntoResponse {
    let sessions = deps.sessions.get_all();
    Json(serde_json::json!({ "sessions": sessions, "count": sessions.len() }))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "Not found" })))
}
