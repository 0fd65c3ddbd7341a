use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{CaseFileId, CaseStatus};

/// Audit record emitted after a status change commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChangeEvent {
    pub case_id: CaseFileId,
    pub code: String,
    /// `None` when the case was just created.
    pub previous_status: Option<CaseStatus>,
    pub new_status: CaseStatus,
    pub created_requirements: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Outbound hook for status-change audit events. Failures never undo the change.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &StatusChangeEvent) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Writes audit events to the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &StatusChangeEvent) -> Result<(), AuditError> {
        info!(
            target: "audit",
            case_id = event.case_id.0,
            code = %event.code,
            previous_status = event.previous_status.map(CaseStatus::as_str),
            new_status = event.new_status.as_str(),
            created_requirements = event.created_requirements,
            "case file status changed"
        );
        Ok(())
    }
}
