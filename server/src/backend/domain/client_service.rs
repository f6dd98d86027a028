//! Client directory derived from appointment and analysis records.
//!
//! Clients are not stored on their own: the records only carry a client name,
//! so the directory is rebuilt from the distinct names every time. Names match
//! case-insensitively with surrounding and repeated whitespace ignored.

use anyhow::Result;
use chrono::NaiveDate;
use log::info;
use shared::{
    Appointment, Client, ClientHistoryResponse, ClientListResponse, InstallmentView,
    PlanInstallment, Reminder, TarotAnalysis,
};
use std::collections::{BTreeMap, HashSet};

use crate::backend::domain::plan_service::PlanService;
use crate::backend::storage::RecordStore;

/// Matching key for a client name
pub fn client_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keys of every client that has at least one appointment or analysis
pub fn known_client_keys(appointments: &[Appointment], analyses: &[TarotAnalysis]) -> HashSet<String> {
    appointments
        .iter()
        .map(|a| client_key(&a.client_name))
        .chain(analyses.iter().map(|a| client_key(&a.client_name)))
        .filter(|key| !key.is_empty())
        .collect()
}

struct ClientVisit<'a> {
    name: &'a str,
    date: NaiveDate,
    created_at: &'a str,
    birth_date: Option<NaiveDate>,
    sign: Option<&'a str>,
    value: f64,
    is_analysis: bool,
}

/// Build the client directory, sorted by client key.
///
/// Display name, birth date and sign come from the most recent record that
/// carries them.
pub fn derive_clients(appointments: &[Appointment], analyses: &[TarotAnalysis]) -> Vec<Client> {
    let mut visits: BTreeMap<String, Vec<ClientVisit>> = BTreeMap::new();

    for appointment in appointments {
        visits
            .entry(client_key(&appointment.client_name))
            .or_default()
            .push(ClientVisit {
                name: appointment.client_name.trim(),
                date: appointment.date,
                created_at: &appointment.created_at,
                birth_date: appointment.birth_date,
                sign: appointment.sign.as_deref(),
                value: appointment.value,
                is_analysis: false,
            });
    }
    for analysis in analyses {
        visits
            .entry(client_key(&analysis.client_name))
            .or_default()
            .push(ClientVisit {
                name: analysis.client_name.trim(),
                date: analysis.date,
                created_at: &analysis.created_at,
                birth_date: analysis.birth_date,
                sign: analysis.sign.as_deref(),
                value: analysis.value,
                is_analysis: true,
            });
    }

    visits
        .into_iter()
        .filter(|(key, _)| !key.is_empty())
        .map(|(_, mut entries)| {
            // Newest first
            entries.sort_by(|a, b| {
                b.date
                    .cmp(&a.date)
                    .then_with(|| b.created_at.cmp(a.created_at))
                    .then_with(|| a.name.cmp(b.name))
            });
            let latest = &entries[0];
            Client {
                name: latest.name.to_string(),
                birth_date: entries.iter().find_map(|e| e.birth_date),
                sign: entries
                    .iter()
                    .find_map(|e| e.sign.filter(|s| !s.trim().is_empty()))
                    .map(str::to_string),
                appointment_count: entries.iter().filter(|e| !e.is_analysis).count(),
                analysis_count: entries.iter().filter(|e| e.is_analysis).count(),
                total_billed: entries.iter().map(|e| e.value).sum(),
                last_visit: Some(latest.date),
            }
        })
        .collect()
}

/// Service for the derived client directory
#[derive(Clone)]
pub struct ClientService {
    store: RecordStore,
    plan_service: PlanService,
}

impl ClientService {
    pub fn new(store: RecordStore, plan_service: PlanService) -> Self {
        Self { store, plan_service }
    }

    /// List all clients ordered by name
    pub fn list_clients(&self) -> Result<ClientListResponse> {
        let appointments: Vec<Appointment> = self.store.load_all()?;
        let analyses: Vec<TarotAnalysis> = self.store.load_all()?;
        let clients = derive_clients(&appointments, &analyses);
        info!("Derived {} clients from {} appointments and {} analyses", clients.len(), appointments.len(), analyses.len());
        Ok(ClientListResponse { clients })
    }

    /// Full history of one client, `None` when no record carries that name
    pub fn get_client_history(&self, name: &str) -> Result<Option<ClientHistoryResponse>> {
        let key = client_key(name);

        // Reconciled view so the history shows corrected due dates
        let installments: Vec<PlanInstallment> = self
            .plan_service
            .list_installments()?
            .installments
            .into_iter()
            .map(|view| view.installment)
            .filter(|i| client_key(&i.client_name) == key)
            .collect();

        let mut appointments: Vec<Appointment> = self.store.load_all()?;
        appointments.retain(|a| client_key(&a.client_name) == key);
        let mut analyses: Vec<TarotAnalysis> = self.store.load_all()?;
        analyses.retain(|a| client_key(&a.client_name) == key);

        let client = match derive_clients(&appointments, &analyses).into_iter().next() {
            Some(client) => client,
            None => return Ok(None),
        };

        appointments.sort_by(|a, b| b.date.cmp(&a.date));
        analyses.sort_by(|a, b| b.date.cmp(&a.date));

        let mut reminders: Vec<Reminder> = self.store.load_all()?;
        reminders.retain(|r| client_key(&r.client_name) == key);

        Ok(Some(ClientHistoryResponse {
            client,
            appointments,
            analyses,
            installments: installments.into_iter().map(InstallmentView::from).collect(),
            reminders,
        }))
    }
}
