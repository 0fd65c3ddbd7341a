use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a case file (expediente).
    CaseFileId,
    "case"
);
numeric_id!(
    /// Identifier of a requirement template.
    TemplateId,
    "template"
);
numeric_id!(
    /// Identifier of a requirement attached to a case file.
    RequirementId,
    "requirement"
);
numeric_id!(EmployerId, "employer");
numeric_id!(WorkerId, "worker");
numeric_id!(UserId, "user");

/// Workflow position of a case file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Draft,
    PendingReview,
    Ready,
    Submitted,
    Required,
    Favorable,
    Denied,
    Archived,
}

impl CaseStatus {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Draft,
            Self::PendingReview,
            Self::Ready,
            Self::Submitted,
            Self::Required,
            Self::Favorable,
            Self::Denied,
            Self::Archived,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PendingReview => "Pending Review",
            Self::Ready => "Ready to Submit",
            Self::Submitted => "Submitted",
            Self::Required => "Correction Required",
            Self::Favorable => "Favorable",
            Self::Denied => "Denied",
            Self::Archived => "Archived",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Ready => "ready",
            Self::Submitted => "submitted",
            Self::Required => "required",
            Self::Favorable => "favorable",
            Self::Denied => "denied",
            Self::Archived => "archived",
        }
    }

    /// Field edits are only accepted while the file is still being assembled or corrected.
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::PendingReview | Self::Required)
    }

    /// Soft deletion is only allowed before the file leaves draft.
    pub const fn is_deletable(self) -> bool {
        matches!(self, Self::Draft)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownVariant::new("case status", raw))
    }
}

/// Kind of sponsorship procedure a case file follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    Seasonal,
    InitialEmployment,
    Renewal,
    SocialRoots,
}

impl CaseType {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Seasonal,
            Self::InitialEmployment,
            Self::Renewal,
            Self::SocialRoots,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Seasonal => "Seasonal Work Permit",
            Self::InitialEmployment => "Initial Residence & Employment",
            Self::Renewal => "Permit Renewal",
            Self::SocialRoots => "Social Roots (Arraigo)",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seasonal => "seasonal",
            Self::InitialEmployment => "initial_employment",
            Self::Renewal => "renewal",
            Self::SocialRoots => "social_roots",
        }
    }
}

impl FromStr for CaseType {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownVariant::new("case type", raw))
    }
}

/// Party that owns a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEntity {
    General,
    Employer,
    Worker,
    Representative,
}

impl TargetEntity {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::General,
            Self::Employer,
            Self::Worker,
            Self::Representative,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Employer => "Employer",
            Self::Worker => "Worker",
            Self::Representative => "Representative",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Employer => "employer",
            Self::Worker => "worker",
            Self::Representative => "representative",
        }
    }
}

impl FromStr for TargetEntity {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|entity| entity.as_str() == normalized)
            .ok_or_else(|| UnknownVariant::new("target entity", raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.trim().to_string(),
        }
    }
}

/// Position offered to the foreign worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOffer {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Gross monthly salary in euros.
    #[serde(default)]
    pub monthly_salary: Option<u32>,
    #[serde(default)]
    pub schedule: Option<String>,
}

/// One immigration-sponsorship matter linking an employer and a foreign worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFile {
    pub id: CaseFileId,
    pub code: String,
    pub campaign: Option<String>,
    pub case_type: CaseType,
    pub title: String,
    pub status: CaseStatus,
    pub job: JobOffer,
    pub employer_id: Option<EmployerId>,
    pub worker_id: Option<WorkerId>,
    pub manager_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CaseFile {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub(crate) fn apply(&mut self, changes: CaseFileChanges) {
        let CaseFileChanges {
            campaign,
            case_type,
            title,
            job,
            employer_id,
            worker_id,
            manager_id,
        } = changes;

        if let Some(campaign) = campaign {
            self.campaign = campaign;
        }
        if let Some(case_type) = case_type {
            self.case_type = case_type;
        }
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(job) = job {
            self.job = job;
        }
        if let Some(employer_id) = employer_id {
            self.employer_id = employer_id;
        }
        if let Some(worker_id) = worker_id {
            self.worker_id = worker_id;
        }
        if let Some(manager_id) = manager_id {
            self.manager_id = manager_id;
        }
    }
}

/// Payload accepted when opening a new case file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCaseFile {
    pub code: String,
    #[serde(default)]
    pub campaign: Option<String>,
    pub case_type: CaseType,
    pub title: String,
    /// Defaults to [`CaseStatus::Draft`].
    #[serde(default)]
    pub status: Option<CaseStatus>,
    #[serde(default)]
    pub job: JobOffer,
    #[serde(default)]
    pub employer_id: Option<EmployerId>,
    #[serde(default)]
    pub worker_id: Option<WorkerId>,
    #[serde(default)]
    pub manager_id: Option<UserId>,
}

/// Partial update of the editable fields. The code is immutable once assigned.
///
/// Nested options let callers clear a field with `Some(None)` (JSON `null`); `None` (field
/// absent) leaves it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFileChanges {
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub campaign: Option<Option<String>>,
    #[serde(default)]
    pub case_type: Option<CaseType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub job: Option<JobOffer>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub employer_id: Option<Option<EmployerId>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub worker_id: Option<Option<WorkerId>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub manager_id: Option<Option<UserId>>,
}

/// Only called for fields present in the payload, so an explicit `null` becomes `Some(None)`.
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Listing filter for case files. Empty filter returns every live case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaseFileFilter {
    #[serde(default)]
    pub status: Option<CaseStatus>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub case_type: Option<CaseType>,
}

impl CaseFileFilter {
    pub fn matches(&self, case: &CaseFile) -> bool {
        self.status.map_or(true, |status| case.status == status)
            && self
                .campaign
                .as_deref()
                .map_or(true, |campaign| case.campaign.as_deref() == Some(campaign))
            && self
                .case_type
                .map_or(true, |case_type| case.case_type == case_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_in_progress_states_are_editable() {
        let editable: Vec<CaseStatus> = CaseStatus::ordered()
            .into_iter()
            .filter(|status| status.is_editable())
            .collect();
        assert_eq!(
            editable,
            vec![
                CaseStatus::Draft,
                CaseStatus::PendingReview,
                CaseStatus::Required
            ]
        );
    }

    #[test]
    fn only_draft_is_deletable() {
        for status in CaseStatus::ordered() {
            assert_eq!(status.is_deletable(), status == CaseStatus::Draft);
        }
    }

    #[test]
    fn status_parses_from_snake_case() {
        assert_eq!(
            " Pending_Review ".parse::<CaseStatus>(),
            Ok(CaseStatus::PendingReview)
        );
        let err = "approved".parse::<CaseStatus>().expect_err("unknown status");
        assert_eq!(err.to_string(), "unknown case status 'approved'");
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&CaseStatus::PendingReview).expect("serialize");
        assert_eq!(json, "\"pending_review\"");
    }

    #[test]
    fn changes_leave_untouched_fields_alone() {
        let now = Utc::now();
        let mut case = CaseFile {
            id: CaseFileId(1),
            code: "EXP-2025-001".to_string(),
            campaign: Some("2025".to_string()),
            case_type: CaseType::Seasonal,
            title: "Strawberry harvest".to_string(),
            status: CaseStatus::Draft,
            job: JobOffer::default(),
            employer_id: Some(EmployerId(4)),
            worker_id: None,
            manager_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        case.apply(CaseFileChanges {
            title: Some("Citrus harvest".to_string()),
            employer_id: Some(None),
            ..CaseFileChanges::default()
        });

        assert_eq!(case.title, "Citrus harvest");
        assert_eq!(case.campaign.as_deref(), Some("2025"));
        assert_eq!(case.employer_id, None);
        assert_eq!(case.code, "EXP-2025-001");
    }

    #[test]
    fn filter_matches_on_every_populated_dimension() {
        let now = Utc::now();
        let case = CaseFile {
            id: CaseFileId(2),
            code: "EXP-2".to_string(),
            campaign: Some("2026".to_string()),
            case_type: CaseType::Renewal,
            title: "Renewal".to_string(),
            status: CaseStatus::Submitted,
            job: JobOffer::default(),
            employer_id: None,
            worker_id: None,
            manager_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        assert!(CaseFileFilter::default().matches(&case));
        assert!(CaseFileFilter {
            status: Some(CaseStatus::Submitted),
            campaign: Some("2026".to_string()),
            case_type: Some(CaseType::Renewal),
        }
        .matches(&case));
        assert!(!CaseFileFilter {
            campaign: Some("2025".to_string()),
            ..CaseFileFilter::default()
        }
        .matches(&case));
    }

    #[test]
    fn changes_distinguish_null_from_absent_fields() {
        let changes: CaseFileChanges = serde_json::from_str(
            r#"{"campaign": null, "employer_id": 12, "title": "Renewed permit"}"#,
        )
        .expect("valid payload");
        assert_eq!(changes.campaign, Some(None));
        assert_eq!(changes.employer_id, Some(Some(EmployerId(12))));
        assert_eq!(changes.worker_id, None);
        assert_eq!(changes.manager_id, None);
        assert_eq!(changes.title.as_deref(), Some("Renewed permit"));

        let untouched: CaseFileChanges = serde_json::from_str("{}").expect("valid payload");
        assert_eq!(untouched, CaseFileChanges::default());
    }
}
