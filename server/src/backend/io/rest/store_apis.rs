//! # REST API for Collection Backups
//!
//! Raw access to one stored collection (`atendimentos`, `analises`,
//! `planos`, `lembretes`) so the dashboard can download a backup and restore
//! it later.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::{error, info};
use shared::{RestoreCollectionResponse, COLLECTION_KEYS};

use crate::backend::io::rest::error_response;
use crate::backend::AppState;

/// Create a router for backup related APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/:key", get(download_collection).put(restore_collection))
}

pub async fn download_collection(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/store/{}", key);
    if !COLLECTION_KEYS.contains(&key.as_str()) {
        return (StatusCode::NOT_FOUND, "Unknown collection").into_response();
    }

    match state.store.load_raw(&key) {
        Ok(raw) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            raw.unwrap_or_else(|| "[]".to_string()),
        )
            .into_response(),
        Err(e) => error_response("read collection", e),
    }
}

pub async fn restore_collection(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: String,
) -> impl IntoResponse {
    info!("PUT /api/store/{} ({} bytes)", key, body.len());
    if !COLLECTION_KEYS.contains(&key.as_str()) {
        return (StatusCode::NOT_FOUND, "Unknown collection").into_response();
    }

    match state.store.restore_raw(&key, &body) {
        Ok(restored) => {
            info!("♻️ Restored {} records into '{}'", restored, key);
            let response = RestoreCollectionResponse {
                success_message: format!("{} registros restaurados", restored),
                key,
                restored,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to restore collection {}: {}", key, e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
