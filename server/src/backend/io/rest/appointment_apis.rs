//! # REST API for Appointments
//!
//! Endpoints for creating, retrieving, updating, and deleting appointments.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::info;
use serde::Deserialize;
use shared::SaveAppointmentRequest;

use crate::backend::io::rest::error_response;
use crate::backend::AppState;

/// Optional `?client=` filter
#[derive(Debug, Deserialize)]
pub struct ClientFilter {
    pub client: Option<String>,
}

/// Create a router for appointment related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(filter): Query<ClientFilter>,
) -> impl IntoResponse {
    info!("GET /api/appointments - client: {:?}", filter.client);

    match state.appointment_service.list_appointments(filter.client.as_deref()) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("list appointments", e),
    }
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(request): Json<SaveAppointmentRequest>,
) -> impl IntoResponse {
    info!("POST /api/appointments - request: {:?}", request);

    match state.appointment_service.create_appointment(request) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response("create appointment", e),
    }
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/appointments/{}", id);

    match state.appointment_service.get_appointment(&id) {
        Ok(Some(appointment)) => (StatusCode::OK, Json(appointment)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Appointment not found").into_response(),
        Err(e) => error_response("get appointment", e),
    }
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SaveAppointmentRequest>,
) -> impl IntoResponse {
    info!("PUT /api/appointments/{} - request: {:?}", id, request);

    match state.appointment_service.update_appointment(&id, request) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("update appointment", e),
    }
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/appointments/{}", id);

    match state.appointment_service.delete_appointment(&id) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response("delete appointment", e),
    }
}
