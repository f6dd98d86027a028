//! # REST API Interface Layer
//!
//! HTTP endpoints for the practice back office. Each `*_apis` module exposes
//! a `router()` that is nested under `/api`.
//!
//! Errors are plain-text bodies: domain validation failures answer 400,
//! missing records 404, anything else 500.

pub mod analysis_apis;
pub mod appointment_apis;
pub mod client_apis;
pub mod plan_apis;
pub mod reminder_apis;
pub mod report_apis;
pub mod store_apis;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;

use crate::backend::domain::DomainError;

/// Status code for a service error
pub fn status_for(e: &anyhow::Error) -> StatusCode {
    match e.downcast_ref::<DomainError>() {
        Some(domain) if domain.is_not_found() => StatusCode::NOT_FOUND,
        Some(_) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log a failed operation and turn it into a response
pub fn error_response(action: &str, e: anyhow::Error) -> Response {
    let status = status_for(&e);
    error!("Failed to {}: {}", action, e);
    (status, e.to_string()).into_response()
}
