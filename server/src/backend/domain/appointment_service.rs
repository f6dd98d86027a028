//! Appointment ("atendimento") service.
//!
//! CRUD over the `atendimentos` collection. Saving an appointment that
//! carries a monthly or weekly plan reconciles the installments in the same
//! store session, so slot 1 exists as soon as the appointment does and due
//! dates follow any change to the plan. Deleting an appointment removes its
//! installments and reminders.

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use shared::{
    Appointment, AppointmentListResponse, AppointmentResponse, DeleteRecordResponse,
    SaveAppointmentRequest,
};

use crate::backend::domain::client_service::client_key;
use crate::backend::domain::errors::DomainError;
use crate::backend::domain::plan_service::PlanService;
use crate::backend::domain::reminder_service::cascade_delete_reminders;
use crate::backend::domain::validation::{
    clean_optional, clean_weekly, validate_client_name, validate_plans, validate_value,
};
use crate::backend::storage::RecordStore;

#[derive(Clone)]
pub struct AppointmentService {
    store: RecordStore,
    plan_service: PlanService,
}

impl AppointmentService {
    pub fn new(store: RecordStore, plan_service: PlanService) -> Self {
        Self { store, plan_service }
    }

    fn validate(request: &SaveAppointmentRequest) -> Result<(), DomainError> {
        validate_client_name(&request.client_name)?;
        if request.service_type.trim().is_empty() {
            return Err(DomainError::EmptyServiceType);
        }
        validate_value(request.value)?;
        validate_plans(
            request.date,
            request.monthly_plan.as_ref(),
            request.weekly_plan.as_ref(),
            request.package_plan.as_ref(),
        )
    }

    fn build(id: String, created_at: String, request: SaveAppointmentRequest) -> Appointment {
        Appointment {
            id,
            client_name: request.client_name.trim().to_string(),
            service_type: request.service_type.trim().to_string(),
            date: request.date,
            value: request.value,
            payment_status: request.payment_status,
            birth_date: request.birth_date,
            sign: clean_optional(request.sign),
            notes: clean_optional(request.notes),
            monthly_plan: request.monthly_plan,
            weekly_plan: clean_weekly(request.weekly_plan),
            package_plan: request.package_plan,
            created_at,
        }
    }

    /// Create a new appointment
    pub fn create_appointment(&self, request: SaveAppointmentRequest) -> Result<AppointmentResponse> {
        info!("Creating appointment for {} on {}", request.client_name.trim(), request.date);
        Self::validate(&request)?;

        let appointment = Self::build(Appointment::generate_id(), Utc::now().to_rfc3339(), request);

        let session = self.store.session()?;
        let mut appointments: Vec<Appointment> = session.load_all()?;
        appointments.push(appointment.clone());
        session.save_all(&appointments)?;

        if appointment.monthly_plan.is_some() || appointment.weekly_plan.is_some() {
            self.plan_service.reconcile_in_session(&session)?;
        }

        info!("✅ Created appointment {} for {}", appointment.id, appointment.client_name);
        Ok(AppointmentResponse {
            success_message: format!("Atendimento de {} registrado", appointment.client_name),
            appointment,
        })
    }

    pub fn get_appointment(&self, id: &str) -> Result<Option<Appointment>> {
        let appointments: Vec<Appointment> = self.store.load_all()?;
        Ok(appointments.into_iter().find(|a| a.id == id))
    }

    /// List appointments newest first, optionally only one client's
    pub fn list_appointments(&self, client_name: Option<&str>) -> Result<AppointmentListResponse> {
        let mut appointments: Vec<Appointment> = self.store.load_all()?;
        if let Some(name) = client_name.map(client_key).filter(|key| !key.is_empty()) {
            appointments.retain(|a| client_key(&a.client_name) == name);
        }
        appointments.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(AppointmentListResponse { appointments })
    }

    /// Replace an appointment, keeping its id and creation time
    pub fn update_appointment(&self, id: &str, request: SaveAppointmentRequest) -> Result<AppointmentResponse> {
        info!("Updating appointment {}", id);
        Self::validate(&request)?;

        let session = self.store.session()?;
        let mut appointments: Vec<Appointment> = session.load_all()?;
        let index = appointments
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| DomainError::not_found("Appointment", id))?;

        let previous = &appointments[index];
        let had_plan = previous.monthly_plan.is_some() || previous.weekly_plan.is_some();
        let updated = Self::build(id.to_string(), previous.created_at.clone(), request);
        let has_plan = updated.monthly_plan.is_some() || updated.weekly_plan.is_some();

        appointments[index] = updated.clone();
        session.save_all(&appointments)?;

        if had_plan || has_plan {
            self.plan_service.reconcile_in_session(&session)?;
        }

        info!("✅ Updated appointment {}", id);
        Ok(AppointmentResponse {
            success_message: format!("Atendimento de {} atualizado", updated.client_name),
            appointment: updated,
        })
    }

    /// Delete an appointment together with its installments and reminders
    pub fn delete_appointment(&self, id: &str) -> Result<DeleteRecordResponse> {
        info!("Deleting appointment {}", id);
        let session = self.store.session()?;
        let mut appointments: Vec<Appointment> = session.load_all()?;
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            warn!("Appointment {} not found for deletion", id);
            return Err(DomainError::not_found("Appointment", id).into());
        }
        session.save_all(&appointments)?;

        let deleted_installments = self.plan_service.cascade_delete(&session, id)?;
        let deleted_reminders = cascade_delete_reminders(&session, id)?;

        info!(
            "🗑️ Deleted appointment {} ({} installments, {} reminders)",
            id, deleted_installments, deleted_reminders
        );
        Ok(DeleteRecordResponse {
            deleted_installments,
            deleted_reminders,
            success_message: "Atendimento excluído".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::MemoryStore;
    use chrono::NaiveDate;
    use shared::{MonthlyPlanConfig, PaymentStatus, PlanInstallment, Reminder};
    use std::sync::Arc;

    fn setup() -> (RecordStore, AppointmentService) {
        let store = RecordStore::new(Arc::new(MemoryStore::new()));
        let service = AppointmentService::new(store.clone(), PlanService::new(store.clone()));
        (store, service)
    }

    fn request(client: &str, day: u32) -> SaveAppointmentRequest {
        SaveAppointmentRequest {
            client_name: client.to_string(),
            service_type: "Mapa Astral".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            value: 150.0,
            payment_status: PaymentStatus::Paid,
            birth_date: None,
            sign: Some("  ".to_string()),
            notes: None,
            monthly_plan: None,
            weekly_plan: None,
            package_plan: None,
        }
    }

    #[test]
    fn test_create_and_get_appointment() {
        let (_store, service) = setup();
        let response = service.create_appointment(request("  Ana  ", 10)).unwrap();
        let created = response.appointment;

        assert!(created.id.starts_with("atendimento::"));
        assert_eq!(created.client_name, "Ana");
        assert_eq!(created.sign, None);
        assert!(!created.created_at.is_empty());
        assert_eq!(service.get_appointment(&created.id).unwrap(), Some(created));
        assert_eq!(service.get_appointment("atendimento::missing").unwrap(), None);
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let (_store, service) = setup();

        let err = service.create_appointment(request(" ", 10)).unwrap_err();
        assert_eq!(err.downcast_ref::<DomainError>(), Some(&DomainError::EmptyClientName));

        let mut negative = request("Ana", 10);
        negative.value = -1.0;
        let err = service.create_appointment(negative).unwrap_err();
        assert_eq!(err.downcast_ref::<DomainError>(), Some(&DomainError::NegativeValue));

        assert!(service.list_appointments(None).unwrap().appointments.is_empty());
    }

    #[test]
    fn test_list_is_newest_first_and_filters_by_client() {
        let (_store, service) = setup();
        service.create_appointment(request("Ana", 5)).unwrap();
        service.create_appointment(request("Bia", 20)).unwrap();
        service.create_appointment(request("ana", 12)).unwrap();

        let all = service.list_appointments(None).unwrap().appointments;
        let days: Vec<String> = all.iter().map(|a| a.date.to_string()).collect();
        assert_eq!(days, vec!["2024-01-20", "2024-01-12", "2024-01-05"]);

        let ana = service.list_appointments(Some("ANA")).unwrap().appointments;
        assert_eq!(ana.len(), 2);
    }

    #[test]
    fn test_plan_materializes_and_follows_updates() {
        let (store, service) = setup();
        let mut with_plan = request("Ana", 15);
        with_plan.payment_status = PaymentStatus::Installment;
        with_plan.monthly_plan = Some(MonthlyPlanConfig { installments: 3, amount: 50.0, due_day: Some(31) });
        let created = service.create_appointment(with_plan.clone()).unwrap().appointment;

        let installments: Vec<PlanInstallment> = store.load_all().unwrap();
        assert_eq!(installments.len(), 1);
        assert_eq!(installments[0].due_date.to_string(), "2024-02-29");
        assert_eq!(installments[0].analysis_id.as_deref(), Some(created.id.as_str()));

        with_plan.monthly_plan = Some(MonthlyPlanConfig { installments: 3, amount: 60.0, due_day: Some(10) });
        service.update_appointment(&created.id, with_plan).unwrap();

        let installments: Vec<PlanInstallment> = store.load_all().unwrap();
        assert_eq!(installments.len(), 1);
        assert_eq!(installments[0].due_date.to_string(), "2024-02-10");
        assert_eq!(installments[0].amount, 60.0);
    }

    #[test]
    fn test_renaming_client_keeps_paid_installments() {
        let (store, service) = setup();
        let mut with_plan = request("Ana", 15);
        with_plan.payment_status = PaymentStatus::Installment;
        with_plan.monthly_plan = Some(MonthlyPlanConfig { installments: 3, amount: 50.0, due_day: Some(31) });
        let created = service.create_appointment(with_plan.clone()).unwrap().appointment;
        let first_id = PlanInstallment::generate_id(shared::PlanKind::Monthly, &created.id, 1);
        PlanService::new(store.clone()).toggle_installment(&first_id).unwrap();

        with_plan.client_name = "Ana Maria".to_string();
        service.update_appointment(&created.id, with_plan).unwrap();

        let mut installments: Vec<PlanInstallment> = store.load_all().unwrap();
        installments.sort_by_key(|i| i.sequence);
        assert_eq!(installments.len(), 2);
        assert_eq!(installments[0].id, first_id);
        assert!(installments[0].is_paid());
        assert!(!installments[1].is_paid());
        assert!(installments.iter().all(|i| i.client_name == "Ana Maria"));
    }

    #[test]
    fn test_update_missing_appointment_is_not_found() {
        let (_store, service) = setup();
        let err = service.update_appointment("atendimento::nope", request("Ana", 1)).unwrap_err();
        assert!(err.downcast_ref::<DomainError>().unwrap().is_not_found());
    }

    #[test]
    fn test_delete_cascades_to_installments_and_reminders() {
        let (store, service) = setup();
        let mut with_plan = request("Ana", 15);
        with_plan.monthly_plan = Some(MonthlyPlanConfig { installments: 2, amount: 50.0, due_day: None });
        let created = service.create_appointment(with_plan).unwrap().appointment;

        {
            let session = store.session().unwrap();
            session
                .save_all(&[Reminder {
                    id: "lembrete::1".to_string(),
                    client_name: "Ana".to_string(),
                    text: "Retorno".to_string(),
                    due_date: None,
                    done: false,
                    analysis_id: Some(created.id.clone()),
                    created_at: String::new(),
                }])
                .unwrap();
        }

        let deleted = service.delete_appointment(&created.id).unwrap();
        assert_eq!(deleted.deleted_installments, 1);
        assert_eq!(deleted.deleted_reminders, 1);

        let installments: Vec<PlanInstallment> = store.load_all().unwrap();
        assert!(installments.is_empty());
        assert!(service.delete_appointment(&created.id).is_err());
    }
}
