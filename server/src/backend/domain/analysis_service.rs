//! Tarot analysis ("análise") service.
//!
//! Same lifecycle as appointments, plus the checklist of reminders embedded
//! in each analysis. On save the checklist is rebuilt from the submitted
//! texts; entries whose text is unchanged keep their id and done flag.

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use shared::{
    AnalysisListResponse, AnalysisReminder, AnalysisResponse, DeleteRecordResponse,
    SaveAnalysisRequest, TarotAnalysis,
};
use uuid::Uuid;

use crate::backend::domain::client_service::client_key;
use crate::backend::domain::errors::DomainError;
use crate::backend::domain::plan_service::PlanService;
use crate::backend::domain::reminder_service::cascade_delete_reminders;
use crate::backend::domain::validation::{
    clean_optional, clean_weekly, validate_client_name, validate_plans, validate_value,
};
use crate::backend::storage::RecordStore;

/// Rebuild the checklist from submitted texts, reusing entries with the same text
pub fn merge_checklist(existing: &[AnalysisReminder], texts: &[String]) -> Vec<AnalysisReminder> {
    let mut available: Vec<&AnalysisReminder> = existing.iter().collect();
    texts
        .iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(|text| match available.iter().position(|r| r.text.trim() == text) {
            Some(index) => available.remove(index).clone(),
            None => AnalysisReminder {
                id: format!("item::{}", Uuid::new_v4().simple()),
                text: text.to_string(),
                done: false,
            },
        })
        .collect()
}

#[derive(Clone)]
pub struct AnalysisService {
    store: RecordStore,
    plan_service: PlanService,
}

impl AnalysisService {
    pub fn new(store: RecordStore, plan_service: PlanService) -> Self {
        Self { store, plan_service }
    }

    fn validate(request: &SaveAnalysisRequest) -> Result<(), DomainError> {
        validate_client_name(&request.client_name)?;
        validate_value(request.value)?;
        validate_plans(
            request.date,
            request.monthly_plan.as_ref(),
            request.weekly_plan.as_ref(),
            request.package_plan.as_ref(),
        )
    }

    fn build(
        id: String,
        created_at: String,
        checklist: &[AnalysisReminder],
        request: SaveAnalysisRequest,
    ) -> TarotAnalysis {
        TarotAnalysis {
            reminders: merge_checklist(checklist, &request.reminders),
            id,
            client_name: request.client_name.trim().to_string(),
            date: request.date,
            value: request.value,
            payment_status: request.payment_status,
            birth_date: request.birth_date,
            sign: clean_optional(request.sign),
            analysis_before: request.analysis_before,
            analysis_after: request.analysis_after,
            monthly_plan: request.monthly_plan,
            weekly_plan: clean_weekly(request.weekly_plan),
            package_plan: request.package_plan,
            created_at,
        }
    }

    pub fn create_analysis(&self, request: SaveAnalysisRequest) -> Result<AnalysisResponse> {
        info!("Creating tarot analysis for {} on {}", request.client_name.trim(), request.date);
        Self::validate(&request)?;

        let analysis = Self::build(TarotAnalysis::generate_id(), Utc::now().to_rfc3339(), &[], request);

        let session = self.store.session()?;
        let mut analyses: Vec<TarotAnalysis> = session.load_all()?;
        analyses.push(analysis.clone());
        session.save_all(&analyses)?;

        if analysis.monthly_plan.is_some() || analysis.weekly_plan.is_some() {
            self.plan_service.reconcile_in_session(&session)?;
        }

        info!("✅ Created tarot analysis {} for {}", analysis.id, analysis.client_name);
        Ok(AnalysisResponse {
            success_message: format!("Análise de {} registrada", analysis.client_name),
            analysis,
        })
    }

    pub fn get_analysis(&self, id: &str) -> Result<Option<TarotAnalysis>> {
        let analyses: Vec<TarotAnalysis> = self.store.load_all()?;
        Ok(analyses.into_iter().find(|a| a.id == id))
    }

    /// List analyses newest first, optionally only one client's
    pub fn list_analyses(&self, client_name: Option<&str>) -> Result<AnalysisListResponse> {
        let mut analyses: Vec<TarotAnalysis> = self.store.load_all()?;
        if let Some(name) = client_name.map(client_key).filter(|key| !key.is_empty()) {
            analyses.retain(|a| client_key(&a.client_name) == name);
        }
        analyses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(AnalysisListResponse { analyses })
    }

    pub fn update_analysis(&self, id: &str, request: SaveAnalysisRequest) -> Result<AnalysisResponse> {
        info!("Updating tarot analysis {}", id);
        Self::validate(&request)?;

        let session = self.store.session()?;
        let mut analyses: Vec<TarotAnalysis> = session.load_all()?;
        let index = analyses
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| DomainError::not_found("Analysis", id))?;

        let previous = &analyses[index];
        let had_plan = previous.monthly_plan.is_some() || previous.weekly_plan.is_some();
        let updated = Self::build(
            id.to_string(),
            previous.created_at.clone(),
            &previous.reminders,
            request,
        );
        let has_plan = updated.monthly_plan.is_some() || updated.weekly_plan.is_some();

        analyses[index] = updated.clone();
        session.save_all(&analyses)?;

        if had_plan || has_plan {
            self.plan_service.reconcile_in_session(&session)?;
        }

        Ok(AnalysisResponse {
            success_message: format!("Análise de {} atualizada", updated.client_name),
            analysis: updated,
        })
    }

    /// Flip the done flag of one checklist entry
    pub fn toggle_checklist_item(&self, analysis_id: &str, item_id: &str) -> Result<AnalysisResponse> {
        let session = self.store.session()?;
        let mut analyses: Vec<TarotAnalysis> = session.load_all()?;
        let analysis = analyses
            .iter_mut()
            .find(|a| a.id == analysis_id)
            .ok_or_else(|| DomainError::not_found("Analysis", analysis_id))?;
        let item = analysis
            .reminders
            .iter_mut()
            .find(|r| r.id == item_id)
            .ok_or_else(|| DomainError::not_found("Checklist item", item_id))?;
        item.done = !item.done;
        let done = item.done;
        let updated = analysis.clone();
        session.save_all(&analyses)?;

        Ok(AnalysisResponse {
            success_message: if done {
                "Item concluído".to_string()
            } else {
                "Item reaberto".to_string()
            },
            analysis: updated,
        })
    }

    /// Delete an analysis together with its installments and reminders
    pub fn delete_analysis(&self, id: &str) -> Result<DeleteRecordResponse> {
        info!("Deleting tarot analysis {}", id);
        let session = self.store.session()?;
        let mut analyses: Vec<TarotAnalysis> = session.load_all()?;
        let before = analyses.len();
        analyses.retain(|a| a.id != id);
        if analyses.len() == before {
            warn!("Analysis {} not found for deletion", id);
            return Err(DomainError::not_found("Analysis", id).into());
        }
        session.save_all(&analyses)?;

        let deleted_installments = self.plan_service.cascade_delete(&session, id)?;
        let deleted_reminders = cascade_delete_reminders(&session, id)?;

        info!(
            "🗑️ Deleted tarot analysis {} ({} installments, {} reminders)",
            id, deleted_installments, deleted_reminders
        );
        Ok(DeleteRecordResponse {
            deleted_installments,
            deleted_reminders,
            success_message: "Análise excluída".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::MemoryStore;
    use chrono::NaiveDate;
    use shared::{PaymentStatus, PlanInstallment, PlanKind, WeeklyPlanConfig};
    use std::sync::Arc;

    fn setup() -> (RecordStore, AnalysisService) {
        let store = RecordStore::new(Arc::new(MemoryStore::new()));
        let service = AnalysisService::new(store.clone(), PlanService::new(store.clone()));
        (store, service)
    }

    fn request(reminders: &[&str]) -> SaveAnalysisRequest {
        SaveAnalysisRequest {
            client_name: "Carla".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            value: 200.0,
            payment_status: PaymentStatus::Pending,
            birth_date: NaiveDate::from_ymd_opt(1990, 8, 1),
            sign: Some("Leão".to_string()),
            analysis_before: "Bloqueio financeiro".to_string(),
            analysis_after: String::new(),
            reminders: reminders.iter().map(|s| s.to_string()).collect(),
            monthly_plan: None,
            weekly_plan: None,
            package_plan: None,
        }
    }

    #[test]
    fn test_merge_checklist_keeps_matching_entries() {
        let existing = vec![
            AnalysisReminder { id: "item::a".into(), text: "Banho de ervas".into(), done: true },
            AnalysisReminder { id: "item::b".into(), text: "Retorno".into(), done: false },
        ];
        let texts: Vec<String> = vec!["Retorno".into(), " ".into(), "Banho de ervas ".into(), "Novo".into()];
        let merged = merge_checklist(&existing, &texts);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id, "item::b");
        assert_eq!(merged[1].id, "item::a");
        assert!(merged[1].done);
        assert!(merged[2].id.starts_with("item::"));
        assert!(!merged[2].done);
    }

    #[test]
    fn test_create_update_and_toggle_checklist() {
        let (_store, service) = setup();
        let created = service.create_analysis(request(&["Retorno", "Vela"])).unwrap().analysis;
        assert!(created.id.starts_with("analise::"));
        assert_eq!(created.reminders.len(), 2);

        let item = created.reminders[0].id.clone();
        let toggled = service.toggle_checklist_item(&created.id, &item).unwrap().analysis;
        assert!(toggled.reminders[0].done);

        let mut edit = request(&["Retorno"]);
        edit.analysis_after = "Caminho aberto".to_string();
        let updated = service.update_analysis(&created.id, edit).unwrap().analysis;
        assert_eq!(updated.reminders.len(), 1);
        assert_eq!(updated.reminders[0].id, item);
        assert!(updated.reminders[0].done);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.analysis_after, "Caminho aberto");

        assert!(service.toggle_checklist_item(&created.id, "item::x").is_err());
    }

    #[test]
    fn test_weekly_plan_materializes_and_delete_cascades() {
        let (store, service) = setup();
        let mut with_plan = request(&[]);
        with_plan.weekly_plan = Some(WeeklyPlanConfig {
            installments: 4,
            amount: 50.0,
            due_weekday: Some("sexta".to_string()),
        });
        let created = service.create_analysis(with_plan).unwrap().analysis;

        let installments: Vec<PlanInstallment> = store.load_all().unwrap();
        assert_eq!(installments.len(), 1);
        assert_eq!(installments[0].kind, PlanKind::Weekly);
        assert_eq!(installments[0].due_date, NaiveDate::from_ymd_opt(2024, 1, 19).unwrap());

        let deleted = service.delete_analysis(&created.id).unwrap();
        assert_eq!(deleted.deleted_installments, 1);
        assert!(service.get_analysis(&created.id).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_by_client() {
        let (_store, service) = setup();
        service.create_analysis(request(&[])).unwrap();
        let mut other = request(&[]);
        other.client_name = "Davi".to_string();
        service.create_analysis(other).unwrap();

        assert_eq!(service.list_analyses(None).unwrap().analyses.len(), 2);
        assert_eq!(service.list_analyses(Some(" carla ")).unwrap().analyses.len(), 1);
    }
}
