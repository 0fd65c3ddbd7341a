mod engine;
mod error;
mod expansion;
mod summary;
pub mod views;

pub use engine::ChecklistEngine;
pub use error::{ActionOutcome, ChecklistError, Missing};
pub use summary::{completion_percentage, upcoming_due, ChecklistSummary, EntityProgressEntry};
pub use views::{
    CaseFileCreated, CaseFileDetail, CompletionOutcome, CreatedRequirementView,
    RegenerationReport, StatusChangeReport, UpcomingRequirementView,
};
