//! # REST API for Tarot Analyses

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;
use shared::SaveAnalysisRequest;

use crate::backend::io::rest::appointment_apis::ClientFilter;
use crate::backend::io::rest::error_response;
use crate::backend::AppState;

/// Create a router for analysis related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_analyses).post(create_analysis))
        .route(
            "/:id",
            get(get_analysis).put(update_analysis).delete(delete_analysis),
        )
        .route("/:id/reminders/:item_id/toggle", post(toggle_checklist_item))
}

pub async fn list_analyses(
    State(state): State<AppState>,
    Query(filter): Query<ClientFilter>,
) -> impl IntoResponse {
    info!("GET /api/analyses - client: {:?}", filter.client);

    match state.analysis_service.list_analyses(filter.client.as_deref()) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list analyses", e),
    }
}

pub async fn create_analysis(
    State(state): State<AppState>,
    Json(request): Json<SaveAnalysisRequest>,
) -> impl IntoResponse {
    info!("POST /api/analyses - client: {}", request.client_name);

    match state.analysis_service.create_analysis(request) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response("create analysis", e),
    }
}

pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/analyses/{}", id);

    match state.analysis_service.get_analysis(&id) {
        Ok(Some(analysis)) => (StatusCode::OK, Json(analysis)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Analysis not found").into_response(),
        Err(e) => error_response("get analysis", e),
    }
}

pub async fn update_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SaveAnalysisRequest>,
) -> impl IntoResponse {
    info!("PUT /api/analyses/{}", id);

    match state.analysis_service.update_analysis(&id, request) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("update analysis", e),
    }
}

pub async fn delete_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/analyses/{}", id);

    match state.analysis_service.delete_analysis(&id) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("delete analysis", e),
    }
}

pub async fn toggle_checklist_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("POST /api/analyses/{}/reminders/{}/toggle", id, item_id);

    match state.analysis_service.toggle_checklist_item(&id, &item_id) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("toggle checklist item", e),
    }
}
