//! Input validation shared by the appointment and analysis services.

use chrono::NaiveDate;
use shared::{MonthlyPlanConfig, PackagePlanConfig, WeeklyPlanConfig};

use crate::backend::domain::errors::DomainError;
use crate::backend::domain::plan_schedule::{monthly_schedule, weekly_schedule};

/// Largest accepted monetary value
pub const MAX_VALUE: f64 = 1_000_000_000.0;

pub fn validate_client_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::EmptyClientName);
    }
    Ok(())
}

pub fn validate_value(value: f64) -> Result<(), DomainError> {
    if value.is_nan() || value < 0.0 {
        return Err(DomainError::NegativeValue);
    }
    if value > MAX_VALUE {
        return Err(DomainError::ValueTooLarge);
    }
    Ok(())
}

/// Check every plan configuration of a record starting on `start`
pub fn validate_plans(
    start: NaiveDate,
    monthly: Option<&MonthlyPlanConfig>,
    weekly: Option<&WeeklyPlanConfig>,
    package: Option<&PackagePlanConfig>,
) -> Result<(), DomainError> {
    if let Some(plan) = monthly {
        validate_value(plan.amount)?;
        monthly_schedule(start, plan.installments, plan.due_day)?;
    }
    if let Some(plan) = weekly {
        validate_value(plan.amount)?;
        weekly_schedule(start, plan.installments, plan.due_weekday.as_deref())?;
    }
    if let Some(plan) = package {
        validate_value(plan.amount)?;
        if plan.sessions == 0 {
            return Err(DomainError::NoSessions);
        }
        if plan.sessions_used > plan.sessions {
            return Err(DomainError::SessionsExceeded {
                sessions: plan.sessions,
                used: plan.sessions_used,
            });
        }
    }
    Ok(())
}

/// Trim optional free text, mapping blank to `None`
pub fn clean_optional(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Drop a blank weekday so the start date's weekday applies
pub fn clean_weekly(plan: Option<WeeklyPlanConfig>) -> Option<WeeklyPlanConfig> {
    plan.map(|plan| WeeklyPlanConfig {
        due_weekday: clean_optional(plan.due_weekday),
        ..plan
    })
}
