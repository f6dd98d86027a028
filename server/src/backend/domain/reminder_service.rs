//! Reminder ("lembrete") service.

use anyhow::Result;
use chrono::Utc;
use log::info;
use shared::{CreateReminderRequest, Reminder, ReminderListResponse, ReminderResponse};
use std::cmp::Ordering;

use crate::backend::domain::errors::DomainError;
use crate::backend::domain::validation::validate_client_name;
use crate::backend::storage::{RecordStore, StoreSession};

/// Pending first, then by due date (undated last), then oldest first
fn reminder_order(a: &Reminder, b: &Reminder) -> Ordering {
    a.done
        .cmp(&b.done)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Remove the reminders attached to a deleted appointment or analysis
pub(crate) fn cascade_delete_reminders(session: &StoreSession<'_>, owner_id: &str) -> Result<usize> {
    let mut reminders: Vec<Reminder> = session.load_all()?;
    let before = reminders.len();
    reminders.retain(|r| r.analysis_id.as_deref() != Some(owner_id));
    let removed = before - reminders.len();
    if removed > 0 {
        session.save_all(&reminders)?;
    }
    Ok(removed)
}

#[derive(Clone)]
pub struct ReminderService {
    store: RecordStore,
}

impl ReminderService {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn create_reminder(&self, request: CreateReminderRequest) -> Result<ReminderResponse> {
        validate_client_name(&request.client_name)?;
        if request.text.trim().is_empty() {
            return Err(DomainError::EmptyReminderText.into());
        }

        let reminder = Reminder {
            id: Reminder::generate_id(),
            client_name: request.client_name.trim().to_string(),
            text: request.text.trim().to_string(),
            due_date: request.due_date,
            done: false,
            analysis_id: request.analysis_id.filter(|id| !id.trim().is_empty()),
            created_at: Utc::now().to_rfc3339(),
        };

        let session = self.store.session()?;
        let mut reminders: Vec<Reminder> = session.load_all()?;
        reminders.push(reminder.clone());
        session.save_all(&reminders)?;

        info!("📝 Created reminder {} for {}", reminder.id, reminder.client_name);
        Ok(ReminderResponse {
            success_message: format!("Lembrete criado para {}", reminder.client_name),
            reminder,
        })
    }

    pub fn list_reminders(&self) -> Result<ReminderListResponse> {
        let mut reminders: Vec<Reminder> = self.store.load_all()?;
        reminders.sort_by(reminder_order);
        Ok(ReminderListResponse { reminders })
    }

    /// Flip the done flag of one reminder
    pub fn toggle_reminder(&self, id: &str) -> Result<ReminderResponse> {
        let session = self.store.session()?;
        let mut reminders: Vec<Reminder> = session.load_all()?;
        let reminder = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DomainError::not_found("Reminder", id))?;
        reminder.done = !reminder.done;
        let toggled = reminder.clone();
        session.save_all(&reminders)?;

        info!("Reminder {} marked {}", id, if toggled.done { "done" } else { "pending" });
        Ok(ReminderResponse {
            success_message: if toggled.done {
                "Lembrete concluído".to_string()
            } else {
                "Lembrete reaberto".to_string()
            },
            reminder: toggled,
        })
    }

    pub fn delete_reminder(&self, id: &str) -> Result<()> {
        let session = self.store.session()?;
        let mut reminders: Vec<Reminder> = session.load_all()?;
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            return Err(DomainError::not_found("Reminder", id).into());
        }
        session.save_all(&reminders)?;
        info!("🗑️ Deleted reminder {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::MemoryStore;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn setup() -> ReminderService {
        ReminderService::new(RecordStore::new(Arc::new(MemoryStore::new())))
    }

    fn request(text: &str, due: Option<(i32, u32, u32)>) -> CreateReminderRequest {
        CreateReminderRequest {
            client_name: "Ana".to_string(),
            text: text.to_string(),
            due_date: due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            analysis_id: None,
        }
    }

    #[test]
    fn test_create_validates_text() {
        let service = setup();
        let err = service.create_reminder(request("   ", None)).unwrap_err();
        assert_eq!(err.downcast_ref::<DomainError>(), Some(&DomainError::EmptyReminderText));
    }

    #[test]
    fn test_list_orders_pending_then_due_date() {
        let service = setup();
        let undated = service.create_reminder(request("Sem data", None)).unwrap().reminder;
        let late = service.create_reminder(request("Depois", Some((2024, 5, 1)))).unwrap().reminder;
        let early = service.create_reminder(request("Antes", Some((2024, 4, 1)))).unwrap().reminder;
        service.toggle_reminder(&early.id).unwrap();

        let texts: Vec<String> = service
            .list_reminders()
            .unwrap()
            .reminders
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["Depois", "Sem data", "Antes"]);
        assert_ne!(undated.id, late.id);
    }

    #[test]
    fn test_toggle_and_delete() {
        let service = setup();
        let created = service.create_reminder(request("Ligar", None)).unwrap().reminder;

        assert!(service.toggle_reminder(&created.id).unwrap().reminder.done);
        assert!(!service.toggle_reminder(&created.id).unwrap().reminder.done);

        service.delete_reminder(&created.id).unwrap();
        assert!(service.list_reminders().unwrap().reminders.is_empty());

        let err = service.delete_reminder(&created.id).unwrap_err();
        assert!(err.downcast_ref::<DomainError>().unwrap().is_not_found());
        assert!(service.toggle_reminder("lembrete::x").is_err());
    }
}
