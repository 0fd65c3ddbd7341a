use chrono::NaiveDate;
use expediente::config::ChecklistConfig;
use expediente::error::AppError;
use expediente::workflows::casefile::{
    ChecklistEngine, Clock, MemoryStore, TemplateCatalogImporter, TracingAuditSink,
    WorkflowServices,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type CaseFileServices = WorkflowServices<MemoryStore, TracingAuditSink>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wires the in-memory store, the tracing audit sink and the template catalog.
pub(crate) fn build_services(
    checklist: &ChecklistConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<CaseFileServices>, AppError> {
    let engine = Arc::new(ChecklistEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(TracingAuditSink),
        clock,
    ));
    let services = WorkflowServices::new(engine, i64::from(checklist.upcoming_days));

    if checklist.seed_templates {
        let seeded = services.templates.seed_standard()?;
        info!(templates = seeded.len(), "standard template catalog seeded");
    }

    if let Some(path) = &checklist.template_csv {
        let drafts = TemplateCatalogImporter::from_path(path)?;
        let created = services.templates.add_missing(drafts)?;
        info!(templates = created.len(), path = %path.display(), "template catalog imported");
    }

    Ok(Arc::new(services))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
