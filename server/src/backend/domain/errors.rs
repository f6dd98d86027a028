//! Domain-level validation and lookup errors.
//!
//! Services return `anyhow::Result`; these errors travel inside it so the IO
//! layer can downcast them and pick a status code.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Client name cannot be empty")]
    EmptyClientName,
    #[error("Service type cannot be empty")]
    EmptyServiceType,
    #[error("Value cannot be negative")]
    NegativeValue,
    #[error("Value is too large")]
    ValueTooLarge,
    #[error("Plan must have at least one installment")]
    NoInstallments,
    #[error("Plan cannot have more than {0} installments")]
    TooManyInstallments(u32),
    #[error("Invalid due day {0}: must be between 1 and 31")]
    InvalidDueDay(u32),
    #[error("Unknown weekday: {0}")]
    UnknownWeekday(String),
    #[error("Package must have at least one session")]
    NoSessions,
    #[error("Package uses {used} sessions but only has {sessions}")]
    SessionsExceeded { sessions: u32, used: u32 },
    #[error("Reminder text cannot be empty")]
    EmptyReminderText,
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("Due date out of range")]
    DateOutOfRange,
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl DomainError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound { kind, id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }
}
