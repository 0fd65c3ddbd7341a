use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CaseFileId, CaseStatus, CaseType, RequirementId, TargetEntity, TemplateId};

/// Upper bound for `days_to_expire`, roughly a century.
pub const MAX_DAYS_TO_EXPIRE: u32 = 36_500;

/// Reusable rule describing what requirement to generate and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    pub target_entity: Option<TargetEntity>,
    /// `None` applies to every case type.
    pub case_type: Option<CaseType>,
    /// `None` marks a manual template that is never fired by a transition.
    pub trigger_status: Option<CaseStatus>,
    pub days_to_expire: Option<u32>,
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RequirementTemplate {
    /// OR-null matching on both dimensions.
    pub fn applies_to(&self, case_type: CaseType, status: CaseStatus, include_manual: bool) -> bool {
        let type_matches = self.case_type.map_or(true, |scoped| scoped == case_type);
        let status_matches = match self.trigger_status {
            Some(trigger) => trigger == status,
            None => include_manual,
        };
        type_matches && status_matches
    }

    pub fn is_manual(&self) -> bool {
        self.trigger_status.is_none()
    }

    /// Materializes the template for a case. Due date is computed from `today`.
    pub fn instantiate(
        &self,
        case_id: CaseFileId,
        today: NaiveDate,
    ) -> Result<NewRequirement, DueDateOutOfRange> {
        let due_date = self
            .days_to_expire
            .map(|days| {
                today
                    .checked_add_signed(Duration::days(i64::from(days)))
                    .ok_or(DueDateOutOfRange {
                        template_id: self.id,
                        from: today,
                        days,
                    })
            })
            .transpose()?;

        Ok(NewRequirement {
            case_id,
            name: self.name.clone(),
            description: self.description.clone(),
            target_entity: self.target_entity,
            due_date,
            mandatory: self.mandatory,
            template_id: Some(self.id),
        })
    }

    pub(crate) fn apply(&mut self, draft: TemplateDraft) {
        let TemplateDraft {
            name,
            description,
            target_entity,
            case_type,
            trigger_status,
            days_to_expire,
            mandatory,
        } = draft;
        self.name = name;
        self.description = description;
        self.target_entity = target_entity;
        self.case_type = case_type;
        self.trigger_status = trigger_status;
        self.days_to_expire = days_to_expire;
        self.mandatory = mandatory;
    }
}

/// Template whose expiry offset overflows the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("template {} due date {days} day(s) after {from} is out of range", .template_id.0)]
pub struct DueDateOutOfRange {
    pub template_id: TemplateId,
    pub from: NaiveDate,
    pub days: u32,
}

/// Template definition without identity, used for creation, edits and catalog seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_entity: Option<TargetEntity>,
    #[serde(default)]
    pub case_type: Option<CaseType>,
    #[serde(default)]
    pub trigger_status: Option<CaseStatus>,
    #[serde(default)]
    pub days_to_expire: Option<u32>,
    #[serde(default)]
    pub mandatory: bool,
}

/// One concrete checklist obligation on a case file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    pub case_id: CaseFileId,
    pub name: String,
    pub description: Option<String>,
    pub target_entity: Option<TargetEntity>,
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub is_mandatory: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub notified_at: Option<DateTime<Utc>>,
    /// Advisory link to the originating template; `None` marks a manual requirement.
    pub template_id: Option<TemplateId>,
    pub created_at: DateTime<Utc>,
}

impl Requirement {
    pub fn is_manual(&self) -> bool {
        self.template_id.is_none()
    }

    pub fn is_pending(&self) -> bool {
        !self.is_completed
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_pending() && self.due_date.is_some_and(|due| due < today)
    }

    /// Signed whole days between `today` and the due date.
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }

    pub(crate) fn complete(&mut self, at: DateTime<Utc>) {
        self.is_completed = true;
        self.completed_at = Some(at);
    }

    pub(crate) fn reopen(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
    }

    pub(crate) fn toggle_completion(&mut self, at: DateTime<Utc>) {
        if self.is_completed {
            self.reopen();
        } else {
            self.complete(at);
        }
    }

    pub(crate) fn toggle_notified(&mut self, at: DateTime<Utc>) {
        self.notified_at = match self.notified_at {
            Some(_) => None,
            None => Some(at),
        };
    }
}

/// Requirement awaiting insertion; the store assigns the id and creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequirement {
    pub case_id: CaseFileId,
    pub name: String,
    pub description: Option<String>,
    pub target_entity: Option<TargetEntity>,
    pub due_date: Option<NaiveDate>,
    pub mandatory: bool,
    pub template_id: Option<TemplateId>,
}

/// Payload for a requirement added by hand to a single case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualRequirement {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_entity: Option<TargetEntity>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub mandatory: bool,
}

impl ManualRequirement {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            target_entity: None,
            due_date: None,
            mandatory: false,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn due_on(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn for_entity(mut self, entity: TargetEntity) -> Self {
        self.target_entity = Some(entity);
        self
    }

    pub(crate) fn into_new(self, case_id: CaseFileId) -> NewRequirement {
        NewRequirement {
            case_id,
            name: self.name,
            description: self.description,
            target_entity: self.target_entity,
            due_date: self.due_date,
            mandatory: self.mandatory,
            template_id: None,
        }
    }
}
