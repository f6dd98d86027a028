//! Financial summary over an optional date range.
//!
//! Appointments and analyses count by their own date, installments by their
//! due date; both range ends are inclusive. Records paid in installments
//! (`parcelado`) do not count their own value towards received or pending,
//! their installments do.

use chrono::NaiveDate;
use shared::{
    Appointment, FinancialSummary, FinancialSummaryRequest, PaymentStatus, PlanInstallment,
    ServiceTotal, TarotAnalysis,
};
use std::collections::HashMap;

use crate::backend::domain::errors::DomainError;

/// Service type under which analyses are reported
pub const ANALYSIS_SERVICE_TYPE: &str = "Análise de Tarot";

struct Period {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl Period {
    fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

pub fn summarize(
    appointments: &[Appointment],
    analyses: &[TarotAnalysis],
    installments: &[PlanInstallment],
    request: &FinancialSummaryRequest,
) -> Result<FinancialSummary, DomainError> {
    if let (Some(start), Some(end)) = (request.start_date, request.end_date) {
        if start > end {
            return Err(DomainError::InvalidDateRange { start, end });
        }
    }
    let period = Period {
        start: request.start_date,
        end: request.end_date,
    };

    let mut summary = FinancialSummary {
        start_date: request.start_date,
        end_date: request.end_date,
        received: 0.0,
        pending: 0.0,
        service_totals: Vec::new(),
        installments_paid: 0,
        installments_pending: 0,
        package_sessions_sold: 0,
        package_sessions_used: 0,
    };
    let mut per_service: HashMap<String, (usize, f64)> = HashMap::new();

    let records = appointments
        .iter()
        .map(|a| (a.service_type.trim(), a.date, a.value, a.payment_status, a.package_plan.as_ref()))
        .chain(analyses.iter().map(|a| {
            (ANALYSIS_SERVICE_TYPE, a.date, a.value, a.payment_status, a.package_plan.as_ref())
        }));

    for (service_type, date, value, status, package) in records {
        if !period.contains(date) {
            continue;
        }
        match status {
            PaymentStatus::Paid => summary.received += value,
            PaymentStatus::Pending => summary.pending += value,
            PaymentStatus::Installment => {}
        }
        let entry = per_service.entry(service_type.to_string()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += value;

        if let Some(package) = package {
            summary.package_sessions_sold = summary.package_sessions_sold.saturating_add(package.sessions);
            summary.package_sessions_used = summary
                .package_sessions_used
                .saturating_add(package.sessions_used.min(package.sessions));
        }
    }

    for installment in installments.iter().filter(|i| period.contains(i.due_date)) {
        if installment.is_paid() {
            summary.received += installment.amount;
            summary.installments_paid += 1;
        } else {
            summary.pending += installment.amount;
            summary.installments_pending += 1;
        }
    }

    let mut service_totals: Vec<ServiceTotal> = per_service
        .into_iter()
        .map(|(service_type, (count, total))| ServiceTotal {
            service_type,
            count,
            total,
        })
        .collect();
    service_totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.service_type.cmp(&b.service_type))
    });
    summary.service_totals = service_totals;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PackagePlanConfig, PlanKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn appointment(service: &str, day: NaiveDate, value: f64, status: PaymentStatus) -> Appointment {
        Appointment {
            id: Appointment::generate_id(),
            client_name: "Ana".to_string(),
            service_type: service.to_string(),
            date: day,
            value,
            payment_status: status,
            birth_date: None,
            sign: None,
            notes: None,
            monthly_plan: None,
            weekly_plan: None,
            package_plan: None,
            created_at: String::new(),
        }
    }

    fn installment(due: NaiveDate, amount: f64, paid: bool) -> PlanInstallment {
        PlanInstallment {
            id: format!("plano::x::{}", due),
            kind: PlanKind::Monthly,
            client_name: "Ana".to_string(),
            amount,
            due_date: due,
            sequence: 1,
            total: 3,
            active: !paid,
            created_at: String::new(),
            analysis_id: None,
        }
    }

    #[test]
    fn test_summary_totals() {
        let mut package = appointment("Pacote", date(2024, 2, 1), 400.0, PaymentStatus::Paid);
        package.package_plan = Some(PackagePlanConfig { sessions: 4, amount: 400.0, sessions_used: 1 });
        let appointments = vec![
            appointment("Tarot", date(2024, 1, 10), 100.0, PaymentStatus::Paid),
            appointment("Tarot", date(2024, 1, 20), 120.0, PaymentStatus::Pending),
            appointment("Mapa Astral", date(2024, 1, 25), 300.0, PaymentStatus::Installment),
            package,
        ];
        let installments = vec![
            installment(date(2024, 2, 25), 100.0, true),
            installment(date(2024, 3, 25), 100.0, false),
        ];

        let summary = summarize(&appointments, &[], &installments, &FinancialSummaryRequest::default()).unwrap();

        assert_eq!(summary.received, 600.0);
        assert_eq!(summary.pending, 220.0);
        assert_eq!(summary.installments_paid, 1);
        assert_eq!(summary.installments_pending, 1);
        assert_eq!(summary.package_sessions_sold, 4);
        assert_eq!(summary.package_sessions_used, 1);

        let services: Vec<(&str, usize)> = summary
            .service_totals
            .iter()
            .map(|s| (s.service_type.as_str(), s.count))
            .collect();
        assert_eq!(services, vec![("Pacote", 1), ("Mapa Astral", 1), ("Tarot", 2)]);
    }

    #[test]
    fn test_package_session_totals_saturate() {
        let appointments: Vec<Appointment> = (0..2)
            .map(|n| {
                let mut package = appointment("Pacote", date(2024, 2, 1 + n), 400.0, PaymentStatus::Paid);
                package.package_plan = Some(PackagePlanConfig {
                    sessions: u32::MAX,
                    amount: 400.0,
                    sessions_used: u32::MAX,
                });
                package
            })
            .collect();

        let summary = summarize(&appointments, &[], &[], &FinancialSummaryRequest::default()).unwrap();
        assert_eq!(summary.package_sessions_sold, u32::MAX);
        assert_eq!(summary.package_sessions_used, u32::MAX);
    }

    #[test]
    fn test_summary_respects_inclusive_range() {
        let appointments = vec![
            appointment("Tarot", date(2024, 1, 1), 10.0, PaymentStatus::Paid),
            appointment("Tarot", date(2024, 1, 31), 20.0, PaymentStatus::Paid),
            appointment("Tarot", date(2024, 2, 1), 40.0, PaymentStatus::Paid),
        ];
        let request = FinancialSummaryRequest {
            start_date: Some(date(2024, 1, 1)),
            end_date: Some(date(2024, 1, 31)),
        };
        let summary = summarize(&appointments, &[], &[], &request).unwrap();
        assert_eq!(summary.received, 30.0);
    }

    #[test]
    fn test_summary_rejects_inverted_range() {
        let request = FinancialSummaryRequest {
            start_date: Some(date(2024, 2, 1)),
            end_date: Some(date(2024, 1, 1)),
        };
        assert!(matches!(
            summarize(&[], &[], &[], &request),
            Err(DomainError::InvalidDateRange { .. })
        ));
    }
}
