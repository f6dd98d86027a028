use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Storage key holding the appointment array
pub const APPOINTMENTS_KEY: &str = "atendimentos";
/// Storage key holding the tarot analysis array
pub const ANALYSES_KEY: &str = "analises";
/// Storage key holding the payment-plan installment array
pub const PLANS_KEY: &str = "planos";
/// Storage key holding the reminder array
pub const REMINDERS_KEY: &str = "lembretes";

/// Every collection key known to the record store
pub const COLLECTION_KEYS: [&str; 4] = [APPOINTMENTS_KEY, ANALYSES_KEY, PLANS_KEY, REMINDERS_KEY];

/// Lenient `YYYY-MM-DD` (de)serialization.
///
/// Older records carry full ISO timestamps (`2024-01-15T03:00:00.000Z`); only
/// the date part is kept.
pub mod serde_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    /// Parse a date string, keeping only the leading `YYYY-MM-DD` part
    pub fn parse_lenient(raw: &str) -> Option<NaiveDate> {
        let trimmed = raw.trim();
        let head = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(head, FORMAT).ok()
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_lenient(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
    }

    /// Same as the parent module for optional fields; empty strings read as `None`
    pub mod option {
        use super::{parse_lenient, FORMAT};
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(s) if s.trim().is_empty() => Ok(None),
                Some(s) => parse_lenient(&s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
            }
        }
    }
}

/// Payment status of an appointment or analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "pago", alias = "paid")]
    Paid,
    #[default]
    #[serde(rename = "pendente", alias = "pending")]
    Pending,
    #[serde(rename = "parcelado", alias = "installment")]
    Installment,
}

impl PaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Pago",
            PaymentStatus::Pending => "Pendente",
            PaymentStatus::Installment => "Parcelado",
        }
    }
}

/// Monthly payment plan attached to an appointment or analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlanConfig {
    /// Number of monthly installments
    pub installments: u32,
    /// Amount charged per installment
    pub amount: f64,
    /// Day of month the installment falls due (1-31, clamped to short months)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_day: Option<u32>,
}

/// Weekly payment plan attached to an appointment or analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlanConfig {
    /// Number of weekly installments
    pub installments: u32,
    /// Amount charged per installment
    pub amount: f64,
    /// Weekday name ("segunda", "sexta-feira", "monday", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_weekday: Option<String>,
}

/// Prepaid package of sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePlanConfig {
    pub sessions: u32,
    /// Price of the whole package
    pub amount: f64,
    #[serde(default)]
    pub sessions_used: u32,
}

impl PackagePlanConfig {
    pub fn sessions_remaining(&self) -> u32 {
        self.sessions.saturating_sub(self.sessions_used)
    }
}

/// Consultation record stored under `atendimentos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub client_name: String,
    pub service_type: String,
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_plan: Option<MonthlyPlanConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_plan: Option<WeeklyPlanConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_plan: Option<PackagePlanConfig>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub created_at: String,
}

impl Appointment {
    pub fn generate_id() -> String {
        format!("atendimento::{}", Uuid::new_v4().simple())
    }
}

/// Checklist entry embedded in a tarot analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReminder {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

/// Tarot analysis record stored under `analises`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TarotAnalysis {
    pub id: String,
    pub client_name: String,
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
    #[serde(default)]
    pub analysis_before: String,
    #[serde(default)]
    pub analysis_after: String,
    #[serde(default)]
    pub reminders: Vec<AnalysisReminder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_plan: Option<MonthlyPlanConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_plan: Option<WeeklyPlanConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_plan: Option<PackagePlanConfig>,
    #[serde(default)]
    pub created_at: String,
}

impl TarotAnalysis {
    pub fn generate_id() -> String {
        format!("analise::{}", Uuid::new_v4().simple())
    }
}

/// Recurrence unit of an installment, persisted as the `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanKind {
    #[serde(rename = "plano")]
    Monthly,
    #[serde(rename = "semanal")]
    Weekly,
}

impl PlanKind {
    /// Tag used in storage and in installment ids
    pub fn tag(&self) -> &'static str {
        match self {
            PlanKind::Monthly => "plano",
            PlanKind::Weekly => "semanal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanKind::Monthly => "Mensal",
            PlanKind::Weekly => "Semanal",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "plano" => Some(PlanKind::Monthly),
            "semanal" => Some(PlanKind::Weekly),
            _ => None,
        }
    }
}

/// Payment-plan installment stored under `planos`.
///
/// `active == true` means the installment is still pending; a paid
/// installment has `active == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInstallment {
    /// ID in format: "<plano|semanal>::<owner id>::<sequence>"
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PlanKind,
    pub client_name: String,
    pub amount: f64,
    #[serde(with = "serde_date")]
    pub due_date: NaiveDate,
    /// Month number for monthly plans, week number for weekly plans (1-based)
    #[serde(alias = "month", alias = "week")]
    pub sequence: u32,
    pub total: u32,
    pub active: bool,
    #[serde(default)]
    pub created_at: String,
    /// Originating appointment or analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
}

impl PlanInstallment {
    pub fn generate_id(kind: PlanKind, owner_id: &str, sequence: u32) -> String {
        format!("{}::{}::{}", kind.tag(), owner_id, sequence)
    }

    /// Parse an installment ID into (kind, owner id, sequence)
    pub fn parse_id(id: &str) -> Result<(PlanKind, String, u32), InstallmentIdError> {
        let (tag, rest) = id.split_once("::").ok_or(InstallmentIdError::InvalidFormat)?;
        let kind = PlanKind::from_tag(tag).ok_or(InstallmentIdError::InvalidKind)?;
        let (owner, sequence) = rest.rsplit_once("::").ok_or(InstallmentIdError::InvalidFormat)?;
        if owner.is_empty() {
            return Err(InstallmentIdError::InvalidFormat);
        }
        let sequence = sequence
            .parse::<u32>()
            .map_err(|_| InstallmentIdError::InvalidSequence)?;
        Ok((kind, owner.to_string(), sequence))
    }

    pub fn is_paid(&self) -> bool {
        !self.active
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstallmentIdError {
    InvalidFormat,
    InvalidKind,
    InvalidSequence,
}

impl fmt::Display for InstallmentIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallmentIdError::InvalidFormat => write!(f, "Invalid installment ID format"),
            InstallmentIdError::InvalidKind => write!(f, "Invalid plan type in installment ID"),
            InstallmentIdError::InvalidSequence => write!(f, "Invalid sequence in installment ID"),
        }
    }
}

impl std::error::Error for InstallmentIdError {}

/// Reminder stored under `lembretes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub client_name: String,
    pub text: String,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Reminder {
    pub fn generate_id() -> String {
        format!("lembrete::{}", Uuid::new_v4().simple())
    }
}

/// Request body for creating or replacing an appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAppointmentRequest {
    pub client_name: String,
    pub service_type: String,
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub sign: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub monthly_plan: Option<MonthlyPlanConfig>,
    #[serde(default)]
    pub weekly_plan: Option<WeeklyPlanConfig>,
    #[serde(default)]
    pub package_plan: Option<PackagePlanConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub appointment: Appointment,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
}

/// Request body for creating or replacing a tarot analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnalysisRequest {
    pub client_name: String,
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub sign: Option<String>,
    #[serde(default)]
    pub analysis_before: String,
    #[serde(default)]
    pub analysis_after: String,
    /// Reminder texts; existing entries keep their id and done flag when the text matches
    #[serde(default)]
    pub reminders: Vec<String>,
    #[serde(default)]
    pub monthly_plan: Option<MonthlyPlanConfig>,
    #[serde(default)]
    pub weekly_plan: Option<WeeklyPlanConfig>,
    #[serde(default)]
    pub package_plan: Option<PackagePlanConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub analysis: TarotAnalysis,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisListResponse {
    pub analyses: Vec<TarotAnalysis>,
}

/// Response after deleting an appointment or analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordResponse {
    pub deleted_installments: usize,
    pub deleted_reminders: usize,
    pub success_message: String,
}

/// Installment as shown to the dashboard, with the derived paid flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentView {
    #[serde(flatten)]
    pub installment: PlanInstallment,
    pub paid: bool,
}

impl From<PlanInstallment> for InstallmentView {
    fn from(installment: PlanInstallment) -> Self {
        let paid = installment.is_paid();
        Self { installment, paid }
    }
}

/// Counters describing what a reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub duplicates_removed: usize,
    pub orphans_pruned: usize,
    pub dates_corrected: usize,
    pub created: usize,
}

impl ReconciliationSummary {
    pub fn has_changes(&self) -> bool {
        self.duplicates_removed + self.orphans_pruned + self.dates_corrected + self.created > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanListResponse {
    pub installments: Vec<InstallmentView>,
    pub paid_count: usize,
    pub pending_count: usize,
    pub reconciliation: ReconciliationSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TogglePlanResponse {
    pub installment: InstallmentView,
    pub created_next: Option<InstallmentView>,
    pub success_message: String,
}

/// One client's installments in the payment overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPaymentGroup {
    pub client_name: String,
    pub most_urgent: InstallmentView,
    pub installments: Vec<InstallmentView>,
    pub paid_count: usize,
    pub pending_count: usize,
    pub pending_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOverviewResponse {
    pub groups: Vec<ClientPaymentGroup>,
    /// Number of clients with installments before truncation
    pub total_clients: usize,
}

/// Client derived from appointment and analysis records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub name: String,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
    pub appointment_count: usize,
    pub analysis_count: usize,
    pub total_billed: f64,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientListResponse {
    pub clients: Vec<Client>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientHistoryResponse {
    pub client: Client,
    pub appointments: Vec<Appointment>,
    pub analyses: Vec<TarotAnalysis>,
    pub installments: Vec<InstallmentView>,
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderRequest {
    pub client_name: String,
    pub text: String,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub analysis_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub reminder: Reminder,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderListResponse {
    pub reminders: Vec<Reminder>,
}

/// Date range for the financial summary; both ends inclusive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummaryRequest {
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTotal {
    pub service_type: String,
    pub count: usize,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "serde_date::option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Paid appointments and analyses plus paid installments
    pub received: f64,
    /// Pending appointments and analyses plus pending installments
    pub pending: f64,
    pub service_totals: Vec<ServiceTotal>,
    pub installments_paid: usize,
    pub installments_pending: usize,
    pub package_sessions_sold: u32,
    pub package_sessions_used: u32,
}

/// Installment export rendered as CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansExportResponse {
    pub csv_content: String,
    pub filename: String,
    pub installment_count: usize,
}

/// Result of restoring one collection from a backup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreCollectionResponse {
    pub key: String,
    pub restored: usize,
    pub success_message: String,
}
