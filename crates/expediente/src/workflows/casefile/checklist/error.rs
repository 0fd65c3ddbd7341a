use serde::Serialize;
use std::fmt;

use super::super::domain::{CaseFileId, CaseStatus, RequirementId, TemplateId};
use super::super::repository::RepositoryError;
use super::super::requirements::DueDateOutOfRange;

/// Record that a lookup could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    CaseFile(CaseFileId),
    Template(TemplateId),
    Requirement(RequirementId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::CaseFile(id) => write!(f, "case file {} not found", id.0),
            Missing::Template(id) => write!(f, "requirement template {} not found", id.0),
            Missing::Requirement(id) => write!(f, "requirement {} not found", id.0),
        }
    }
}

/// Error raised by the checklist engine and the case-file operations built on it.
#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error("{0}")]
    NotFound(Missing),
    #[error("cannot change status from '{}' to '{}'", .from.label(), .to.label())]
    IllegalTransition { from: CaseStatus, to: CaseStatus },
    #[error("case file cannot be edited while '{}'", .status.label())]
    NotEditable { status: CaseStatus },
    #[error("only draft case files can be deleted (current status '{}')", .status.label())]
    InvalidState { status: CaseStatus },
    #[error("requirement {} is already completed", .id.0)]
    AlreadyCompleted { id: RequirementId },
    #[error("requirement {} is completed and cannot be deleted", .id.0)]
    CannotDeleteCompleted { id: RequirementId },
    #[error("requirement {} was generated from a template and cannot be deleted", .id.0)]
    CannotDeleteTemplateDerived { id: RequirementId },
    #[error("a case file with code '{0}' already exists")]
    DuplicateCode(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DueDateOutOfRange> for ChecklistError {
    fn from(value: DueDateOutOfRange) -> Self {
        ChecklistError::Invalid(value.to_string())
    }
}

impl ChecklistError {
    /// Storage failures are fatal; everything else is a business rejection the caller can show.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ChecklistError::Repository(_))
    }
}

/// Structured result surfaced to callers instead of raw business errors.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome<T> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T> ActionOutcome<T> {
    pub fn succeeded(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Folds business rejections into a failed outcome. Infrastructure errors stay `Err`.
    pub fn settle<F>(result: Result<T, ChecklistError>, message: F) -> Result<Self, ChecklistError>
    where
        F: FnOnce(&T) -> String,
    {
        match result {
            Ok(data) => Ok(Self::succeeded(message(&data), data)),
            Err(err) if err.is_infrastructure() => Err(err),
            Err(err) => Ok(Self::failed(err.to_string())),
        }
    }
}
