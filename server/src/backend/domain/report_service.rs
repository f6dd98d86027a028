//! Report service: financial summary and per-client PDF reports.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use log::info;
use shared::{
    Appointment, FinancialSummary, FinancialSummaryRequest, InstallmentView, PlanInstallment,
    TarotAnalysis,
};

use crate::backend::config::PracticeSettings;
use crate::backend::domain::client_service::ClientService;
use crate::backend::domain::errors::DomainError;
use crate::backend::domain::financial_summary::summarize;
use crate::backend::domain::pdf_document::{format_money, PdfReport};
use crate::backend::domain::plan_service::PlanService;
use crate::backend::storage::RecordStore;

/// A rendered file ready to be sent to the browser
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

fn br_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn period_label(summary: &FinancialSummary) -> String {
    match (summary.start_date, summary.end_date) {
        (Some(start), Some(end)) => format!("{} a {}", br_date(start), br_date(end)),
        (Some(start), None) => format!("a partir de {}", br_date(start)),
        (None, Some(end)) => format!("até {}", br_date(end)),
        (None, None) => "todo o período".to_string(),
    }
}

/// File-name friendly form of a client name
fn slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "cliente".to_string()
    } else {
        slug
    }
}

#[derive(Clone)]
pub struct ReportService {
    store: RecordStore,
    plan_service: PlanService,
    client_service: ClientService,
    settings: PracticeSettings,
}

impl ReportService {
    pub fn new(
        store: RecordStore,
        plan_service: PlanService,
        client_service: ClientService,
        settings: PracticeSettings,
    ) -> Self {
        Self {
            store,
            plan_service,
            client_service,
            settings,
        }
    }

    fn money(&self, value: f64) -> String {
        format_money(value, &self.settings.currency_symbol)
    }

    pub fn financial_summary(&self, request: &FinancialSummaryRequest) -> Result<FinancialSummary> {
        let installments: Vec<PlanInstallment> = self
            .plan_service
            .list_installments()?
            .installments
            .into_iter()
            .map(|view| view.installment)
            .collect();
        let appointments: Vec<Appointment> = self.store.load_all()?;
        let analyses: Vec<TarotAnalysis> = self.store.load_all()?;

        let summary = summarize(&appointments, &analyses, &installments, request)?;
        info!(
            "📊 Financial summary ({}): received {:.2}, pending {:.2}",
            period_label(&summary),
            summary.received,
            summary.pending
        );
        Ok(summary)
    }

    pub fn financial_pdf(&self, request: &FinancialSummaryRequest) -> Result<RenderedDocument> {
        let summary = self.financial_summary(request)?;

        let mut report = PdfReport::new("Resumo financeiro", &self.settings.report_footer)?;
        report.title(&self.settings.business_name);
        report.field("Relatório", "Resumo financeiro");
        report.field("Período", &period_label(&summary));
        report.field("Emitido em", &Local::now().format("%d/%m/%Y %H:%M").to_string());

        report.heading("Totais");
        report.field("Recebido", &self.money(summary.received));
        report.field("A receber", &self.money(summary.pending));
        report.field(
            "Parcelas",
            &format!("{} pagas, {} pendentes", summary.installments_paid, summary.installments_pending),
        );
        report.field(
            "Pacotes",
            &format!(
                "{} sessões vendidas, {} utilizadas",
                summary.package_sessions_sold, summary.package_sessions_used
            ),
        );

        report.heading("Por serviço");
        report.row(
            &[
                (0.0, "Serviço".to_string()),
                (110.0, "Qtd.".to_string()),
                (140.0, "Total".to_string()),
            ],
            true,
        );
        for service in &summary.service_totals {
            report.row(
                &[
                    (0.0, service.service_type.clone()),
                    (110.0, service.count.to_string()),
                    (140.0, self.money(service.total)),
                ],
                false,
            );
        }

        let filename = match (summary.start_date, summary.end_date) {
            (Some(start), Some(end)) => format!(
                "resumo_financeiro_{}_{}.pdf",
                start.format("%Y%m%d"),
                end.format("%Y%m%d")
            ),
            _ => "resumo_financeiro.pdf".to_string(),
        };
        let bytes = report.finish()?;
        info!("✅ Rendered {} ({} bytes)", filename, bytes.len());
        Ok(RenderedDocument { filename, bytes })
    }

    /// Client header, appointment and analysis history and plan status
    pub fn client_pdf(&self, name: &str) -> Result<RenderedDocument> {
        let history = self
            .client_service
            .get_client_history(name)?
            .ok_or_else(|| DomainError::not_found("Client", name))?;
        let client = &history.client;

        let mut report = PdfReport::new(&format!("Relatório de {}", client.name), &self.settings.report_footer)?;
        report.title(&self.settings.business_name);
        report.field("Cliente", &client.name);
        if let Some(birth_date) = client.birth_date {
            report.field("Nascimento", &br_date(birth_date));
        }
        if let Some(sign) = &client.sign {
            report.field("Signo", sign);
        }
        report.field(
            "Histórico",
            &format!(
                "{} atendimentos, {} análises, {} faturados",
                client.appointment_count,
                client.analysis_count,
                self.money(client.total_billed)
            ),
        );

        if !history.appointments.is_empty() {
            report.heading("Atendimentos");
            report.row(
                &[
                    (0.0, "Data".to_string()),
                    (25.0, "Serviço".to_string()),
                    (110.0, "Valor".to_string()),
                    (145.0, "Status".to_string()),
                ],
                true,
            );
            for appointment in &history.appointments {
                report.row(
                    &[
                        (0.0, br_date(appointment.date)),
                        (25.0, appointment.service_type.clone()),
                        (110.0, self.money(appointment.value)),
                        (145.0, appointment.payment_status.label().to_string()),
                    ],
                    false,
                );
                if let Some(package) = &appointment.package_plan {
                    report.paragraph(&format!(
                        "Pacote: {} de {} sessões restantes",
                        package.sessions_remaining(),
                        package.sessions
                    ));
                }
                if let Some(notes) = &appointment.notes {
                    report.paragraph(notes);
                }
            }
        }

        for analysis in &history.analyses {
            report.heading(&format!("Análise de {}", br_date(analysis.date)));
            report.field("Valor", &self.money(analysis.value));
            report.field("Status", analysis.payment_status.label());
            if !analysis.analysis_before.trim().is_empty() {
                report.field("Antes", "");
                report.paragraph(&analysis.analysis_before);
            }
            if !analysis.analysis_after.trim().is_empty() {
                report.field("Depois", "");
                report.paragraph(&analysis.analysis_after);
            }
            for item in &analysis.reminders {
                let mark = if item.done { "[x]" } else { "[ ]" };
                report.paragraph(&format!("{} {}", mark, item.text));
            }
        }

        if !history.installments.is_empty() {
            report.heading("Parcelas");
            report.row(
                &[
                    (0.0, "Vencimento".to_string()),
                    (30.0, "Tipo".to_string()),
                    (60.0, "Parcela".to_string()),
                    (90.0, "Valor".to_string()),
                    (130.0, "Status".to_string()),
                ],
                true,
            );
            for InstallmentView { installment, paid } in &history.installments {
                report.row(
                    &[
                        (0.0, br_date(installment.due_date)),
                        (30.0, installment.kind.label().to_string()),
                        (60.0, format!("{}/{}", installment.sequence, installment.total)),
                        (90.0, self.money(installment.amount)),
                        (130.0, if *paid { "Pago" } else { "Pendente" }.to_string()),
                    ],
                    false,
                );
            }
        }

        let pending: Vec<_> = history.reminders.iter().filter(|r| !r.done).collect();
        if !pending.is_empty() {
            report.heading("Lembretes pendentes");
            for reminder in pending {
                let due = reminder.due_date.map(br_date).unwrap_or_else(|| "sem data".to_string());
                report.paragraph(&format!("{} ({})", reminder.text, due));
            }
        }

        let filename = format!("relatorio_{}.pdf", slug(&client.name));
        let bytes = report.finish()?;
        info!("✅ Rendered {} ({} bytes)", filename, bytes.len());
        Ok(RenderedDocument { filename, bytes })
    }
}
