use chrono::{DateTime, Utc};

use super::domain::{
    CaseFile, CaseFileFilter, CaseFileId, CaseStatus, CaseType, NewCaseFile, RequirementId,
    TemplateId,
};
use super::requirements::{NewRequirement, Requirement, RequirementTemplate, TemplateDraft};

/// Which requirements of a case to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementScope {
    All,
    Pending,
}

/// Case-file storage. Soft-deleted rows are invisible to every read.
pub trait CaseFileRepository: Send + Sync {
    fn find_case(&self, id: CaseFileId) -> Result<Option<CaseFile>, RepositoryError>;
    fn find_case_by_code(&self, code: &str) -> Result<Option<CaseFile>, RepositoryError>;
    fn find_case_with_requirements(
        &self,
        id: CaseFileId,
    ) -> Result<Option<(CaseFile, Vec<Requirement>)>, RepositoryError>;
    fn list_cases(&self, filter: &CaseFileFilter) -> Result<Vec<CaseFile>, RepositoryError>;
    /// Inserts the case in `case.status`, or draft when unset. Codes are unique.
    fn insert_case(&self, case: NewCaseFile, at: DateTime<Utc>)
        -> Result<CaseFile, RepositoryError>;
    fn update_case(&self, case: &CaseFile) -> Result<(), RepositoryError>;
    fn update_case_status(
        &self,
        id: CaseFileId,
        status: CaseStatus,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    fn soft_delete_case(&self, id: CaseFileId, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}

/// Template catalog storage.
pub trait TemplateRepository: Send + Sync {
    fn find_template(&self, id: TemplateId) -> Result<Option<RequirementTemplate>, RepositoryError>;
    fn list_templates(&self) -> Result<Vec<RequirementTemplate>, RepositoryError>;
    /// Templates whose case type and trigger status match, treating `None` as a wildcard for the
    /// case type. Manual templates (no trigger) are only returned when `include_manual` is set.
    fn find_applicable_templates(
        &self,
        case_type: CaseType,
        status: CaseStatus,
        include_manual: bool,
    ) -> Result<Vec<RequirementTemplate>, RepositoryError>;
    fn insert_template(&self, draft: TemplateDraft) -> Result<RequirementTemplate, RepositoryError>;
    fn update_template(&self, template: &RequirementTemplate) -> Result<(), RepositoryError>;
    fn soft_delete_template(&self, id: TemplateId, at: DateTime<Utc>)
        -> Result<(), RepositoryError>;
}

/// Requirement storage.
pub trait RequirementRepository: Send + Sync {
    fn find_requirement(&self, id: RequirementId) -> Result<Option<Requirement>, RepositoryError>;
    fn requirements_for_case(
        &self,
        case_id: CaseFileId,
        scope: RequirementScope,
    ) -> Result<Vec<Requirement>, RepositoryError>;
    fn insert_requirement(
        &self,
        requirement: NewRequirement,
        at: DateTime<Utc>,
    ) -> Result<Requirement, RepositoryError>;
    /// Batch insert; either every row is stored or none is.
    fn insert_requirements(
        &self,
        requirements: Vec<NewRequirement>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Requirement>, RepositoryError>;
    fn update_requirement(&self, requirement: &Requirement) -> Result<(), RepositoryError>;
    fn delete_requirement(&self, id: RequirementId) -> Result<(), RepositoryError>;
}

/// The three repositories as seen from inside a unit of work.
pub trait ChecklistRepositories:
    CaseFileRepository + TemplateRepository + RequirementRepository
{
}

impl<T> ChecklistRepositories for T where
    T: CaseFileRepository + TemplateRepository + RequirementRepository + ?Sized
{
}

/// Storage backend with a transaction boundary.
pub trait ChecklistStore: ChecklistRepositories {
    /// Runs `work` against a staged view of the store. `Ok` commits every write made through the
    /// view; `Err` discards all of them.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ChecklistRepositories) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
