//! # Backend Module
//!
//! Contains all non-UI logic for the practice back office.
//!
//! ## Architecture
//!
//! ```text
//! Dashboard page (out of scope)
//!     ↓
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (plans, reconciliation, records, reports)
//!     ↓
//! Storage Layer (keyed JSON documents)
//! ```
//!
//! ## Key Responsibilities
//!
//! - Initialize and configure the application state
//! - Set up the REST API router with CORS for the dashboard origin

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::backend::config::{AppConfig, PracticeSettings};
use crate::backend::domain::{
    AnalysisService, AppointmentService, ClientService, ExportService, PlanService,
    ReminderService, ReportService,
};
use crate::backend::storage::{JsonConnection, RecordStore};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub appointment_service: AppointmentService,
    pub analysis_service: AnalysisService,
    pub plan_service: PlanService,
    pub client_service: ClientService,
    pub reminder_service: ReminderService,
    pub report_service: ReportService,
    pub export_service: ExportService,
}

impl AppState {
    /// Wire every service on top of one record store
    pub fn new(store: RecordStore, settings: PracticeSettings) -> Self {
        let plan_service = PlanService::new(store.clone());
        let client_service = ClientService::new(store.clone(), plan_service.clone());
        Self {
            appointment_service: AppointmentService::new(store.clone(), plan_service.clone()),
            analysis_service: AnalysisService::new(store.clone(), plan_service.clone()),
            reminder_service: ReminderService::new(store.clone()),
            report_service: ReportService::new(
                store.clone(),
                plan_service.clone(),
                client_service.clone(),
                settings,
            ),
            export_service: ExportService::new(plan_service.clone()),
            client_service,
            plan_service,
            store,
        }
    }
}

/// Initialize the backend with all required services
pub fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up storage in {:?}", config.data_dir);
    let connection = JsonConnection::new(&config.data_dir)?;
    let settings = PracticeSettings::load_or_create(connection.base_directory())?;

    info!("Setting up domain model for {}", settings.business_name);
    let store = RecordStore::new(Arc::new(connection));

    Ok(AppState::new(store, settings))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: &str) -> Result<Router> {
    let origin = allowed_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid allowed origin: {}", allowed_origin))?;

    // CORS setup to allow the dashboard to make requests
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/appointments", io::rest::appointment_apis::router())
        .nest("/analyses", io::rest::analysis_apis::router())
        .nest("/plans", io::rest::plan_apis::router())
        .nest("/clients", io::rest::client_apis::router())
        .nest("/reminders", io::rest::reminder_apis::router())
        .nest("/reports", io::rest::report_apis::router())
        .nest("/store", io::rest::store_apis::router());

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state))
}
