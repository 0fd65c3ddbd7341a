use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::super::domain::{
    CaseFile, CaseFileId, CaseStatus, RequirementId, TargetEntity, TemplateId,
};
use super::super::requirements::Requirement;
use super::summary::ChecklistSummary;

/// Compact description of a requirement created by template expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedRequirementView {
    pub id: RequirementId,
    pub name: String,
    pub target_entity: Option<TargetEntity>,
    pub due_date: Option<NaiveDate>,
    pub mandatory: bool,
}

impl From<&Requirement> for CreatedRequirementView {
    fn from(requirement: &Requirement) -> Self {
        Self {
            id: requirement.id,
            name: requirement.name.clone(),
            target_entity: requirement.target_entity,
            due_date: requirement.due_date,
            mandatory: requirement.is_mandatory,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChangeReport {
    pub case_id: CaseFileId,
    pub code: String,
    pub previous_status: CaseStatus,
    pub new_status: CaseStatus,
    pub new_status_label: &'static str,
    pub created_requirements: Vec<CreatedRequirementView>,
}

impl StatusChangeReport {
    pub fn message(&self) -> String {
        format!(
            "Status changed to '{}'; {} requirement(s) created",
            self.new_status_label,
            self.created_requirements.len()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenerationReport {
    pub case_id: CaseFileId,
    pub status: CaseStatus,
    pub created: usize,
    pub updated: usize,
    pub created_requirements: Vec<CreatedRequirementView>,
}

impl RegenerationReport {
    pub fn message(&self) -> String {
        format!(
            "{} requirement(s) created, {} refreshed",
            self.created, self.updated
        )
    }
}

/// Requirement together with the owning case's refreshed checklist.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub requirement: Requirement,
    pub summary: ChecklistSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingRequirementView {
    pub id: RequirementId,
    pub name: String,
    pub target_entity: Option<TargetEntity>,
    pub due_date: NaiveDate,
    pub days_remaining: i64,
    pub mandatory: bool,
    pub template_id: Option<TemplateId>,
    pub notified_at: Option<DateTime<Utc>>,
}

/// Case file with its requirements and reachable next states.
#[derive(Debug, Clone, Serialize)]
pub struct CaseFileDetail {
    pub case: CaseFile,
    pub status_label: &'static str,
    pub editable: bool,
    pub next_statuses: Vec<CaseStatus>,
    pub requirements: Vec<Requirement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseFileCreated {
    pub case: CaseFile,
    pub created_requirements: Vec<CreatedRequirementView>,
}
