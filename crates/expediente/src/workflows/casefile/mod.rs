//! Case files, their status workflow and the requirement checklist driven by it.
//!
//! A status change validates against the [`StatusGraph`], then updates the case and expands the
//! matching [`RequirementTemplate`]s inside a single unit of work on the [`ChecklistStore`].

pub mod audit;
mod blueprint;
pub mod checklist;
pub mod clock;
pub mod domain;
mod import;
pub mod memory;
mod registry;
pub mod repository;
pub mod requirements;
pub mod router;
mod service;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use audit::{AuditError, AuditSink, StatusChangeEvent, TracingAuditSink};
pub use blueprint::ChecklistBlueprint;
pub use checklist::{
    ActionOutcome, CaseFileCreated, CaseFileDetail, ChecklistEngine, ChecklistError,
    ChecklistSummary, CompletionOutcome, CreatedRequirementView, EntityProgressEntry, Missing,
    RegenerationReport, StatusChangeReport, UpcomingRequirementView,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    CaseFile, CaseFileChanges, CaseFileFilter, CaseFileId, CaseStatus, CaseType, EmployerId,
    JobOffer, NewCaseFile, RequirementId, TargetEntity, TemplateId, UnknownVariant, UserId,
    WorkerId,
};
pub use import::{CatalogImportError, TemplateCatalogImporter};
pub use memory::MemoryStore;
pub use registry::{TemplateImportError, TemplateRegistry};
pub use repository::{
    CaseFileRepository, ChecklistRepositories, ChecklistStore, RepositoryError,
    RequirementRepository, RequirementScope, TemplateRepository,
};
pub use requirements::{
    DueDateOutOfRange, ManualRequirement, NewRequirement, Requirement, RequirementTemplate,
    TemplateDraft, MAX_DAYS_TO_EXPIRE,
};
pub use router::{casefile_router, WorkflowServices};
pub use service::CaseFileService;
pub use transitions::{StatusGraph, StatusNodeView};
