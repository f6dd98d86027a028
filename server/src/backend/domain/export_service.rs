//! Export service for payment-plan installments.
//!
//! Renders the reconciled installment list as CSV, one row per installment,
//! ordered by due date.

use anyhow::Result;
use chrono::Utc;
use csv::Writer;
use log::info;
use serde::Serialize;
use shared::{PlanInstallment, PlansExportResponse};

use crate::backend::domain::plan_service::PlanService;

/// One CSV row
#[derive(Debug, Serialize)]
struct InstallmentRecord<'a> {
    id: &'a str,
    tipo: &'a str,
    cliente: &'a str,
    parcela: u32,
    total: u32,
    vencimento: String,
    valor: String,
    status: &'static str,
    origem: &'a str,
}

impl<'a> From<&'a PlanInstallment> for InstallmentRecord<'a> {
    fn from(installment: &'a PlanInstallment) -> Self {
        Self {
            id: &installment.id,
            tipo: installment.kind.label(),
            cliente: &installment.client_name,
            parcela: installment.sequence,
            total: installment.total,
            vencimento: installment.due_date.format("%Y-%m-%d").to_string(),
            valor: format!("{:.2}", installment.amount),
            status: if installment.is_paid() { "pago" } else { "pendente" },
            origem: installment.analysis_id.as_deref().unwrap_or(""),
        }
    }
}

/// Render installments as CSV with a header row
pub fn installments_to_csv(installments: &[PlanInstallment]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    if installments.is_empty() {
        writer.write_record([
            "id", "tipo", "cliente", "parcela", "total", "vencimento", "valor", "status", "origem",
        ])?;
    }
    for installment in installments {
        writer.serialize(InstallmentRecord::from(installment))?;
    }
    writer.flush()?;
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV export: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

#[derive(Clone)]
pub struct ExportService {
    plan_service: PlanService,
}

impl ExportService {
    pub fn new(plan_service: PlanService) -> Self {
        Self { plan_service }
    }

    /// Export every installment as CSV
    pub fn export_installments_csv(&self) -> Result<PlansExportResponse> {
        info!("📄 EXPORT: Exporting installments as CSV");
        let installments: Vec<PlanInstallment> = self
            .plan_service
            .list_installments()?
            .installments
            .into_iter()
            .map(|view| view.installment)
            .collect();

        let csv_content = installments_to_csv(&installments)?;
        let filename = format!("parcelas_{}.csv", Utc::now().format("%Y%m%d"));

        info!(
            "✅ EXPORT: Exported {} installments ({} bytes) as {}",
            installments.len(),
            csv_content.len(),
            filename
        );
        Ok(PlansExportResponse {
            csv_content,
            filename,
            installment_count: installments.len(),
        })
    }
}
