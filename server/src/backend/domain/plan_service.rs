//! Payment plan service.
//!
//! Wraps the pure reconciliation and grouping logic with storage: every
//! listing reconciles the persisted installments against the current
//! appointments and analyses and writes the corrections back, all inside one
//! store session.

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use shared::{
    Appointment, InstallmentView, PaymentOverviewResponse, PlanInstallment, PlanListResponse,
    TarotAnalysis, TogglePlanResponse,
};

use crate::backend::domain::client_service::known_client_keys;
use crate::backend::domain::payment_overview::{group_by_client, OVERVIEW_LIMIT};
use crate::backend::domain::plan_schedule::plan_owners;
use crate::backend::domain::reconciliation::{self, KnownRecords, ReconcileOutcome};
use crate::backend::storage::{RecordStore, StoreSession};

#[derive(Clone)]
pub struct PlanService {
    store: RecordStore,
}

impl PlanService {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Reconcile inside an open session, persisting only when something changed.
    ///
    /// When the appointments or analyses could not be read in full the pass
    /// runs without pruning and nothing is written back.
    pub(crate) fn reconcile_in_session(&self, session: &StoreSession<'_>) -> Result<ReconcileOutcome> {
        let appointments = session.load_checked::<Appointment>()?;
        let analyses = session.load_checked::<TarotAnalysis>()?;
        let installments: Vec<PlanInstallment> = session.load_all()?;
        let complete = !appointments.degraded && !analyses.degraded;
        let (appointments, analyses) = (appointments.records, analyses.records);

        let owners = plan_owners(&appointments, &analyses);
        let known = KnownRecords {
            clients: known_client_keys(&appointments, &analyses),
            ids: appointments
                .iter()
                .map(|a| a.id.clone())
                .chain(analyses.iter().map(|a| a.id.clone()))
                .collect(),
            complete,
        };
        let now = Utc::now().to_rfc3339();
        let outcome = reconciliation::reconcile(installments, &owners, &known, &now);

        if !complete {
            warn!("⚠️ Appointments or analyses have unreadable records, installments left untouched in storage");
        } else if outcome.changed {
            session.save_all(&outcome.installments)?;
            info!(
                "🔧 Reconciled installments: {} duplicates removed, {} orphans pruned, {} dates corrected, {} created",
                outcome.summary.duplicates_removed,
                outcome.summary.orphans_pruned,
                outcome.summary.dates_corrected,
                outcome.summary.created
            );
        } else {
            debug!("Installments already consistent ({} records)", outcome.installments.len());
        }
        Ok(outcome)
    }

    /// List every installment, reconciled and ordered by due date
    pub fn list_installments(&self) -> Result<PlanListResponse> {
        let session = self.store.session()?;
        let outcome = self.reconcile_in_session(&session)?;
        drop(session);

        let mut installments = outcome.installments;
        installments.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        let paid_count = installments.iter().filter(|i| i.is_paid()).count();

        Ok(PlanListResponse {
            pending_count: installments.len() - paid_count,
            paid_count,
            installments: installments.into_iter().map(InstallmentView::from).collect(),
            reconciliation: outcome.summary,
        })
    }

    /// Flip one installment between paid and pending
    pub fn toggle_installment(&self, id: &str) -> Result<TogglePlanResponse> {
        info!("Toggling installment {}", id);
        let session = self.store.session()?;

        let appointments: Vec<Appointment> = session.load_all()?;
        let analyses: Vec<TarotAnalysis> = session.load_all()?;
        let mut installments: Vec<PlanInstallment> = session.load_all()?;
        let owners = plan_owners(&appointments, &analyses);

        let now = Utc::now().to_rfc3339();
        let outcome = reconciliation::toggle_installment(&mut installments, id, &owners, &now)?;
        session.save_all(&installments)?;

        let success_message = if outcome.installment.is_paid() {
            match &outcome.created_next {
                Some(next) => format!(
                    "Parcela {}/{} paga; parcela {} vence em {}",
                    outcome.installment.sequence,
                    outcome.installment.total,
                    next.sequence,
                    next.due_date.format("%d/%m/%Y")
                ),
                None => format!(
                    "Parcela {}/{} paga",
                    outcome.installment.sequence, outcome.installment.total
                ),
            }
        } else {
            format!(
                "Parcela {}/{} marcada como pendente",
                outcome.installment.sequence, outcome.installment.total
            )
        };
        info!("✅ {}", success_message);

        Ok(TogglePlanResponse {
            installment: InstallmentView::from(outcome.installment),
            created_next: outcome.created_next.map(InstallmentView::from),
            success_message,
        })
    }

    /// Installments grouped per client, most urgent first
    pub fn payment_overview(&self) -> Result<PaymentOverviewResponse> {
        let installments: Vec<PlanInstallment> = self
            .list_installments()?
            .installments
            .into_iter()
            .map(|view| view.installment)
            .collect();
        Ok(group_by_client(&installments, OVERVIEW_LIMIT))
    }

    /// Remove the installments of a deleted appointment or analysis.
    ///
    /// Legacy installments without an owner reference match through the owner
    /// part of their id. Returns the number removed.
    pub(crate) fn cascade_delete(&self, session: &StoreSession<'_>, owner_id: &str) -> Result<usize> {
        let mut installments: Vec<PlanInstallment> = session.load_all()?;
        let before = installments.len();
        installments.retain(|i| !belongs_to(i, owner_id));
        let removed = before - installments.len();
        if removed > 0 {
            session.save_all(&installments)?;
            info!("🗑️ Removed {} installments of {}", removed, owner_id);
        }
        Ok(removed)
    }
}

fn belongs_to(installment: &PlanInstallment, owner_id: &str) -> bool {
    match &installment.analysis_id {
        Some(id) => id == owner_id,
        None => match PlanInstallment::parse_id(&installment.id) {
            Ok((_, owner, _)) => owner == owner_id,
            Err(_) => installment.id.contains(owner_id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::errors::DomainError;
    use crate::backend::storage::{KeyValueStore, MemoryStore};
    use chrono::NaiveDate;
    use shared::{MonthlyPlanConfig, PaymentStatus, PlanKind, WeeklyPlanConfig};
    use std::sync::Arc;

    fn setup() -> (RecordStore, PlanService) {
        let store = RecordStore::new(Arc::new(MemoryStore::new()));
        (store.clone(), PlanService::new(store))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn appointment_with_plan(id: &str, client: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            client_name: client.to_string(),
            service_type: "Tarot".to_string(),
            date: date(2024, 1, 15),
            value: 300.0,
            payment_status: PaymentStatus::Installment,
            birth_date: None,
            sign: None,
            notes: None,
            monthly_plan: Some(MonthlyPlanConfig { installments: 3, amount: 100.0, due_day: Some(31) }),
            weekly_plan: None,
            package_plan: None,
            created_at: String::new(),
        }
    }

    fn seed(store: &RecordStore, appointments: &[Appointment], installments: &[PlanInstallment]) {
        let session = store.session().unwrap();
        session.save_all(appointments).unwrap();
        session.save_all(installments).unwrap();
    }

    #[test]
    fn test_listing_materializes_and_persists() {
        let (store, service) = setup();
        seed(&store, &[appointment_with_plan("atendimento::1", "Ana")], &[]);

        let listed = service.list_installments().unwrap();
        assert_eq!(listed.installments.len(), 1);
        assert_eq!(listed.pending_count, 1);
        assert_eq!(listed.reconciliation.created, 1);

        let persisted: Vec<PlanInstallment> = store.load_all().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].due_date, date(2024, 2, 29));

        // A second listing has nothing left to fix
        let again = service.list_installments().unwrap();
        assert!(!again.reconciliation.has_changes());
    }

    #[test]
    fn test_toggle_flow_creates_next_installment() {
        let (store, service) = setup();
        seed(&store, &[appointment_with_plan("atendimento::1", "Ana")], &[]);
        service.list_installments().unwrap();

        let toggled = service.toggle_installment("plano::atendimento::1::1").unwrap();
        assert!(toggled.installment.paid);
        let next = toggled.created_next.unwrap();
        assert_eq!(next.installment.due_date, date(2024, 3, 31));
        assert!(!next.paid);

        let listed = service.list_installments().unwrap();
        assert_eq!(listed.paid_count, 1);
        assert_eq!(listed.pending_count, 1);
    }

    #[test]
    fn test_toggle_unknown_installment() {
        let (_store, service) = setup();
        let err = service.toggle_installment("plano::x::1").unwrap_err();
        let domain = err.downcast_ref::<DomainError>().unwrap();
        assert!(domain.is_not_found());
    }

    #[test]
    fn test_orphans_are_pruned_from_storage() {
        let (store, service) = setup();
        let orphan = PlanInstallment {
            id: "semanal::fantasma::1".to_string(),
            kind: PlanKind::Weekly,
            client_name: "Fantasma".to_string(),
            amount: 10.0,
            due_date: date(2024, 1, 5),
            sequence: 1,
            total: 4,
            active: true,
            created_at: String::new(),
            analysis_id: None,
        };
        seed(&store, &[], &[orphan]);

        let listed = service.list_installments().unwrap();
        assert!(listed.installments.is_empty());
        assert_eq!(listed.reconciliation.orphans_pruned, 1);
        let persisted: Vec<PlanInstallment> = store.load_all().unwrap();
        assert!(persisted.is_empty());
    }

    #[test]
    fn test_unreadable_appointment_keeps_installments_in_storage() {
        let memory = MemoryStore::new();
        let store = RecordStore::new(Arc::new(memory.clone()));
        let service = PlanService::new(store.clone());
        seed(&store, &[appointment_with_plan("atendimento::1", "Ana")], &[]);
        service.list_installments().unwrap();
        service.toggle_installment("plano::atendimento::1::1").unwrap();

        let raw = memory.get(shared::APPOINTMENTS_KEY).unwrap().unwrap();
        let mut document: serde_json::Value = serde_json::from_str(&raw).unwrap();
        document[0]["value"] = serde_json::json!("300");
        memory.set(shared::APPOINTMENTS_KEY, &document.to_string()).unwrap();

        let listed = service.list_installments().unwrap();
        assert_eq!(listed.reconciliation.orphans_pruned, 0);
        assert_eq!(listed.installments.len(), 2);

        let persisted: Vec<PlanInstallment> = store.load_all().unwrap();
        assert_eq!(persisted.len(), 2);
        assert!(persisted.iter().any(|i| i.is_paid()));
        assert_eq!(memory.preserved().len(), 1);
    }

    #[test]
    fn test_cascade_delete_matches_owner_and_legacy_ids() {
        let (store, service) = setup();
        let mut weekly = appointment_with_plan("atendimento::1", "Ana");
        weekly.weekly_plan = Some(WeeklyPlanConfig { installments: 2, amount: 50.0, due_weekday: None });
        seed(&store, &[weekly], &[]);
        service.list_installments().unwrap();

        let session = store.session().unwrap();
        let mut installments: Vec<PlanInstallment> = session.load_all().unwrap();
        installments.push(PlanInstallment {
            id: "plano::atendimento::1::9".to_string(),
            analysis_id: None,
            ..installments[0].clone()
        });
        installments.push(PlanInstallment {
            id: "plano::atendimento::2::1".to_string(),
            analysis_id: Some("atendimento::2".to_string()),
            ..installments[0].clone()
        });
        session.save_all(&installments).unwrap();

        assert_eq!(service.cascade_delete(&session, "atendimento::1").unwrap(), 3);
        let remaining: Vec<PlanInstallment> = session.load_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "plano::atendimento::2::1");
    }

    #[test]
    fn test_overview_groups_reconciled_installments() {
        let (store, service) = setup();
        seed(
            &store,
            &[
                appointment_with_plan("atendimento::1", "Ana"),
                appointment_with_plan("atendimento::2", "Bia"),
            ],
            &[],
        );
        let overview = service.payment_overview().unwrap();
        assert_eq!(overview.total_clients, 2);
        assert_eq!(overview.groups[0].client_name, "Ana");
    }
}
