//! Installment schedule generation for monthly and weekly payment plans.
//!
//! Everything here is pure date arithmetic: given the owning record's start
//! date, the number of installments and the due-day / due-weekday rule, it
//! produces the expected slots. Reconciliation compares persisted
//! installments against these slots.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use shared::{Appointment, MonthlyPlanConfig, PlanKind, TarotAnalysis, WeeklyPlanConfig};

use crate::backend::domain::errors::DomainError;

/// Upper bound on installments per plan (ten years of weekly payments)
pub const MAX_INSTALLMENTS: u32 = 520;

/// One expected installment position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSlot {
    /// 1-based month or week number
    pub sequence: u32,
    pub due_date: NaiveDate,
}

/// Check if a year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Get the number of days in a given month and year
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Move `months` calendar months forward and land on `day`, clamped to the
/// last day of the target month
pub fn add_months_clamped(date: NaiveDate, months: u32, day: u32) -> Option<NaiveDate> {
    let month_index = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(months);
    let year = i32::try_from(month_index.div_euclid(12)).ok()?;
    let month = month_index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

/// First date strictly after `date` that falls on `target`
pub fn first_weekday_after(date: NaiveDate, target: Weekday) -> Option<NaiveDate> {
    let current = i64::from(date.weekday().num_days_from_monday());
    let wanted = i64::from(target.num_days_from_monday());
    let ahead = match (wanted - current).rem_euclid(7) {
        0 => 7,
        n => n as u64,
    };
    date.checked_add_days(Days::new(ahead))
}

/// Map a weekday name to a weekday.
///
/// Accepts Portuguese names with or without accents and the `-feira` suffix,
/// English names, three-letter abbreviations of both, and the numbers 0-6
/// counted from Sunday.
pub fn parse_weekday(name: &str) -> Result<Weekday, DomainError> {
    let normalized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect();
    let base = normalized
        .trim_end_matches("-feira")
        .trim_end_matches(" feira")
        .trim();

    let weekday = match base {
        "0" | "domingo" | "dom" | "sunday" | "sun" => Weekday::Sun,
        "1" | "segunda" | "seg" | "monday" | "mon" => Weekday::Mon,
        "2" | "terca" | "ter" | "tuesday" | "tue" => Weekday::Tue,
        "3" | "quarta" | "qua" | "wednesday" | "wed" => Weekday::Wed,
        "4" | "quinta" | "qui" | "thursday" | "thu" => Weekday::Thu,
        "5" | "sexta" | "sex" | "friday" | "fri" => Weekday::Fri,
        "6" | "sabado" | "sab" | "saturday" | "sat" => Weekday::Sat,
        _ => return Err(DomainError::UnknownWeekday(name.to_string())),
    };
    Ok(weekday)
}

fn validate_count(installments: u32) -> Result<(), DomainError> {
    if installments == 0 {
        return Err(DomainError::NoInstallments);
    }
    if installments > MAX_INSTALLMENTS {
        return Err(DomainError::TooManyInstallments(MAX_INSTALLMENTS));
    }
    Ok(())
}

/// Monthly slots: slot `k` falls in the month `start + k`, on `due_day`
/// (or the start date's day) clamped to that month's length
pub fn monthly_schedule(
    start: NaiveDate,
    installments: u32,
    due_day: Option<u32>,
) -> Result<Vec<PlanSlot>, DomainError> {
    validate_count(installments)?;
    let day = match due_day {
        Some(d) if (1..=31).contains(&d) => d,
        Some(d) => return Err(DomainError::InvalidDueDay(d)),
        None => start.day(),
    };

    (1..=installments)
        .map(|sequence| {
            add_months_clamped(start, sequence, day)
                .map(|due_date| PlanSlot { sequence, due_date })
                .ok_or(DomainError::DateOutOfRange)
        })
        .collect()
}

/// Weekly slots: the first falls on the next `due_weekday` strictly after
/// the start date (same weekday as the start when none is given), then every
/// seven days
pub fn weekly_schedule(
    start: NaiveDate,
    installments: u32,
    due_weekday: Option<&str>,
) -> Result<Vec<PlanSlot>, DomainError> {
    validate_count(installments)?;
    let target = match due_weekday {
        Some(name) if !name.trim().is_empty() => parse_weekday(name)?,
        _ => start.weekday(),
    };
    let first = first_weekday_after(start, target).ok_or(DomainError::DateOutOfRange)?;

    (1..=installments)
        .map(|sequence| {
            first
                .checked_add_days(Days::new(7 * u64::from(sequence - 1)))
                .map(|due_date| PlanSlot { sequence, due_date })
                .ok_or(DomainError::DateOutOfRange)
        })
        .collect()
}

/// Expected terms of one plan of one owner
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTerms {
    pub kind: PlanKind,
    pub total: u32,
    pub amount: f64,
    pub slots: Vec<PlanSlot>,
}

impl PlanTerms {
    pub fn slot(&self, sequence: u32) -> Option<&PlanSlot> {
        sequence
            .checked_sub(1)
            .and_then(|index| self.slots.get(index as usize))
    }
}

/// An appointment or analysis seen only through its plan configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOwner {
    pub id: String,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub monthly: Option<MonthlyPlanConfig>,
    pub weekly: Option<WeeklyPlanConfig>,
}

impl PlanOwner {
    pub fn has_recurring_plan(&self) -> bool {
        self.monthly.is_some() || self.weekly.is_some()
    }

    pub fn has_plan(&self, kind: PlanKind) -> bool {
        match kind {
            PlanKind::Monthly => self.monthly.is_some(),
            PlanKind::Weekly => self.weekly.is_some(),
        }
    }

    /// Expected slots for the plan of `kind`, `None` when the owner has no such plan
    pub fn terms(&self, kind: PlanKind) -> Result<Option<PlanTerms>, DomainError> {
        match kind {
            PlanKind::Monthly => self
                .monthly
                .as_ref()
                .map(|config| {
                    monthly_schedule(self.start_date, config.installments, config.due_day).map(
                        |slots| PlanTerms {
                            kind,
                            total: config.installments,
                            amount: config.amount,
                            slots,
                        },
                    )
                })
                .transpose(),
            PlanKind::Weekly => self
                .weekly
                .as_ref()
                .map(|config| {
                    weekly_schedule(
                        self.start_date,
                        config.installments,
                        config.due_weekday.as_deref(),
                    )
                    .map(|slots| PlanTerms {
                        kind,
                        total: config.installments,
                        amount: config.amount,
                        slots,
                    })
                })
                .transpose(),
        }
    }
}

impl From<&Appointment> for PlanOwner {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.clone(),
            client_name: appointment.client_name.clone(),
            start_date: appointment.date,
            monthly: appointment.monthly_plan.clone(),
            weekly: appointment.weekly_plan.clone(),
        }
    }
}

impl From<&TarotAnalysis> for PlanOwner {
    fn from(analysis: &TarotAnalysis) -> Self {
        Self {
            id: analysis.id.clone(),
            client_name: analysis.client_name.clone(),
            start_date: analysis.date,
            monthly: analysis.monthly_plan.clone(),
            weekly: analysis.weekly_plan.clone(),
        }
    }
}

/// Owners that carry a monthly or weekly plan
pub fn plan_owners(appointments: &[Appointment], analyses: &[TarotAnalysis]) -> Vec<PlanOwner> {
    appointments
        .iter()
        .map(PlanOwner::from)
        .chain(analyses.iter().map(PlanOwner::from))
        .filter(PlanOwner::has_recurring_plan)
        .collect()
}
