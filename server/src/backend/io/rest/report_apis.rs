//! # REST API for Reports
//!
//! Financial summary as JSON or PDF, per-client PDF reports and the
//! installment CSV export.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use log::info;
use shared::FinancialSummaryRequest;

use crate::backend::domain::RenderedDocument;
use crate::backend::io::rest::error_response;
use crate::backend::AppState;

/// Create a router for report related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/financial", get(financial_summary))
        .route("/financial.pdf", get(financial_pdf))
        .route("/clients/:name/pdf", get(client_pdf))
        .route("/plans.csv", get(export_plans_csv))
}

fn attachment(content_type: &str, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

fn pdf_response(document: RenderedDocument) -> Response {
    attachment("application/pdf", &document.filename, document.bytes)
}

pub async fn financial_summary(
    State(state): State<AppState>,
    Query(request): Query<FinancialSummaryRequest>,
) -> impl IntoResponse {
    info!("GET /api/reports/financial - {:?}", request);

    match state.report_service.financial_summary(&request) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response("build financial summary", e),
    }
}

pub async fn financial_pdf(
    State(state): State<AppState>,
    Query(request): Query<FinancialSummaryRequest>,
) -> impl IntoResponse {
    info!("📄 GET /api/reports/financial.pdf - {:?}", request);

    match state.report_service.financial_pdf(&request) {
        Ok(document) => pdf_response(document),
        Err(e) => error_response("render financial report", e),
    }
}

pub async fn client_pdf(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    info!("📄 GET /api/reports/clients/{}/pdf", name);

    match state.report_service.client_pdf(&name) {
        Ok(document) => pdf_response(document),
        Err(e) => error_response("render client report", e),
    }
}

pub async fn export_plans_csv(State(state): State<AppState>) -> impl IntoResponse {
    info!("📄 GET /api/reports/plans.csv");

    match state.export_service.export_installments_csv() {
        Ok(export) => attachment(
            "text/csv; charset=utf-8",
            &export.filename,
            export.csv_content.into_bytes(),
        ),
        Err(e) => error_response("export installments", e),
    }
}
