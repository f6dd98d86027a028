//! # REST API for Clients

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::info;

use crate::backend::io::rest::error_response;
use crate::backend::AppState;

/// Create a router for client related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients))
        .route("/:name", get(get_client_history))
}

pub async fn list_clients(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/clients");

    match state.client_service.list_clients() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list clients", e),
    }
}

pub async fn get_client_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/clients/{}", name);

    match state.client_service.get_client_history(&name) {
        Ok(Some(history)) => (StatusCode::OK, Json(history)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Client not found").into_response(),
        Err(e) => error_response("get client history", e),
    }
}
