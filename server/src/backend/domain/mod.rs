//! # Domain Module
//!
//! Contains all business logic for the practice back office.
//!
//! ## Module Organization
//!
//! - **plan_schedule**: pure due-date generation for monthly and weekly plans
//! - **reconciliation**: matching persisted installments to expected slots,
//!   duplicate suppression, orphan pruning and the paid/pending toggle
//! - **payment_overview**: per-client grouping of installments
//! - **plan_service**: reconciliation and toggling against storage
//! - **appointment_service** / **analysis_service**: record CRUD with
//!   cascading delete
//! - **client_service**: client directory derived from the records
//! - **reminder_service**: standalone reminders
//! - **financial_summary** / **report_service** / **pdf_document**: reports
//! - **export_service**: installment CSV export
//!
//! ## Business Rules
//!
//! - An installment with `active == true` is pending; `false` means paid
//! - Installments are created lazily: slot 1 when the plan exists, slot `k`
//!   once slot `k - 1` is paid
//! - Paid installments are never deleted except with their owning record
//! - Client names match case-insensitively, ignoring extra whitespace

pub mod analysis_service;
pub mod appointment_service;
pub mod client_service;
pub mod errors;
pub mod export_service;
pub mod financial_summary;
pub mod payment_overview;
pub mod pdf_document;
pub mod plan_schedule;
pub mod plan_service;
pub mod reconciliation;
pub mod reminder_service;
pub mod report_service;
pub mod validation;

pub use analysis_service::AnalysisService;
pub use appointment_service::AppointmentService;
pub use client_service::ClientService;
pub use errors::DomainError;
pub use export_service::ExportService;
pub use plan_service::PlanService;
pub use reminder_service::ReminderService;
pub use report_service::{RenderedDocument, ReportService};
