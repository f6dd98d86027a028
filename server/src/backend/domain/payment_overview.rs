//! Per-client grouping of installments for the payments dashboard.

use chrono::NaiveDate;
use shared::{ClientPaymentGroup, InstallmentView, PaymentOverviewResponse, PlanInstallment};
use std::collections::BTreeMap;

use crate::backend::domain::client_service::client_key;
use crate::backend::domain::reconciliation::dedupe_installments;

/// Maximum number of client groups returned by the overview
pub const OVERVIEW_LIMIT: usize = 20;

/// Nearest-due pending installment, or the nearest-due overall when all are paid
fn most_urgent(installments: &[PlanInstallment]) -> Option<&PlanInstallment> {
    let by_due = |a: &&PlanInstallment, b: &&PlanInstallment| {
        a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id))
    };
    installments
        .iter()
        .filter(|i| i.active)
        .min_by(by_due)
        .or_else(|| installments.iter().min_by(by_due))
}

/// Group installments by client, most urgent first, keeping at most `limit` groups.
///
/// Groups order by the due date of their most urgent installment, then by
/// client key. Installments inside a group order by due date.
pub fn group_by_client(installments: &[PlanInstallment], limit: usize) -> PaymentOverviewResponse {
    let (unique, _) = dedupe_installments(installments.to_vec());

    let mut by_client: BTreeMap<String, Vec<PlanInstallment>> = BTreeMap::new();
    for installment in unique {
        let key = client_key(&installment.client_name);
        if key.is_empty() {
            continue;
        }
        by_client.entry(key).or_default().push(installment);
    }

    let mut groups: Vec<(NaiveDate, String, ClientPaymentGroup)> = Vec::new();
    for (key, mut members) in by_client {
        members.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.sequence.cmp(&b.sequence))
                .then_with(|| a.id.cmp(&b.id))
        });
        let Some(urgent) = most_urgent(&members).cloned() else {
            continue;
        };

        let pending: Vec<&PlanInstallment> = members.iter().filter(|i| i.active).collect();
        // Display name of the most recently created installment
        let client_name = members
            .iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| b.id.cmp(&a.id)))
            .map(|i| i.client_name.trim().to_string())
            .unwrap_or_default();

        let group = ClientPaymentGroup {
            client_name,
            paid_count: members.len() - pending.len(),
            pending_count: pending.len(),
            pending_amount: pending.iter().map(|i| i.amount).sum(),
            most_urgent: InstallmentView::from(urgent.clone()),
            installments: members.into_iter().map(InstallmentView::from).collect(),
        };
        groups.push((urgent.due_date, key, group));
    }

    groups.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let total_clients = groups.len();
    PaymentOverviewResponse {
        groups: groups.into_iter().take(limit).map(|(_, _, group)| group).collect(),
        total_clients,
    }
}
