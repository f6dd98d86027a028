//! # REST API for Reminders

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use log::info;
use shared::CreateReminderRequest;

use crate::backend::io::rest::error_response;
use crate::backend::AppState;

/// Create a router for reminder related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reminders).post(create_reminder))
        .route("/:id", delete(delete_reminder))
        .route("/:id/toggle", post(toggle_reminder))
}

pub async fn list_reminders(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/reminders");

    match state.reminder_service.list_reminders() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list reminders", e),
    }
}

pub async fn create_reminder(
    State(state): State<AppState>,
    Json(request): Json<CreateReminderRequest>,
) -> impl IntoResponse {
    info!("POST /api/reminders - request: {:?}", request);

    match state.reminder_service.create_reminder(request) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response("create reminder", e),
    }
}

pub async fn toggle_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/reminders/{}/toggle", id);

    match state.reminder_service.toggle_reminder(&id) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("toggle reminder", e),
    }
}

pub async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/reminders/{}", id);

    match state.reminder_service.delete_reminder(&id) {
        Ok(()) => (StatusCode::NO_CONTENT, "").into_response(),
        Err(e) => error_response("delete reminder", e),
    }
}
