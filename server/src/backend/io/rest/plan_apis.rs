//! # REST API for Payment Plans
//!
//! Listing reconciles the stored installments first, so every response
//! reflects the current appointments and analyses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;

use crate::backend::io::rest::error_response;
use crate::backend::AppState;

/// Create a router for payment plan related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_installments))
        .route("/overview", get(payment_overview))
        .route("/:id/toggle", post(toggle_installment))
}

pub async fn list_installments(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/plans");

    match state.plan_service.list_installments() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list installments", e),
    }
}

pub async fn payment_overview(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/plans/overview");

    match state.plan_service.payment_overview() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("build payment overview", e),
    }
}

pub async fn toggle_installment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/plans/{}/toggle", id);

    match state.plan_service.toggle_installment(&id) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("toggle installment", e),
    }
}
