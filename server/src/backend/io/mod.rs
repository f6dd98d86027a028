//! # IO Module
//!
//! Interface layer between the dashboard page and the domain logic. Handlers
//! translate HTTP requests into service calls and domain errors into status
//! codes; no business rules live here.
//!
//! ## Supported Operations
//!
//! - **/api/appointments**, **/api/analyses**: record CRUD
//! - **/api/plans**: reconciled installments, toggle, per-client overview
//! - **/api/clients**: derived client directory and history
//! - **/api/reminders**: reminder list and toggling
//! - **/api/reports**: financial summary, PDFs, CSV export
//! - **/api/store**: raw backup and restore of one collection

pub mod rest;
