//! Tarot Desk back office: appointments, tarot analyses, payment plans,
//! reminders and reports over keyed JSON storage, served as a local REST API.

pub mod backend;
