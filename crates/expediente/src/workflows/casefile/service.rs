use std::sync::Arc;
use tracing::info;

use super::audit::AuditSink;
use super::checklist::{
    CaseFileCreated, CaseFileDetail, ChecklistEngine, ChecklistError, CreatedRequirementView,
    Missing, StatusChangeReport,
};
use super::domain::{
    CaseFile, CaseFileChanges, CaseFileFilter, CaseFileId, CaseStatus, NewCaseFile,
};
use super::repository::{CaseFileRepository, ChecklistStore, RepositoryError};

/// Case-file lifecycle operations layered on the checklist engine.
pub struct CaseFileService<S, A> {
    engine: Arc<ChecklistEngine<S, A>>,
}

impl<S, A> CaseFileService<S, A>
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    pub fn new(engine: Arc<ChecklistEngine<S, A>>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ChecklistEngine<S, A>> {
        &self.engine
    }

    /// Opens a case file and materializes the templates of its starting status in the same unit
    /// of work.
    pub fn create(&self, mut case: NewCaseFile) -> Result<CaseFileCreated, ChecklistError> {
        case.code = case.code.trim().to_string();
        if case.code.is_empty() {
            return Err(ChecklistError::Invalid(
                "case file code must not be blank".to_string(),
            ));
        }
        if case.title.trim().is_empty() {
            return Err(ChecklistError::Invalid(
                "case file title must not be blank".to_string(),
            ));
        }
        if case.status.is_none() {
            case.status = Some(self.engine.graph().initial());
        }

        let code = case.code.clone();
        let now = self.engine.clock().now();
        let (record, created) = self.engine.store().atomically(|tx| {
            let record = tx.insert_case(case, now).map_err(|err| match err {
                RepositoryError::Conflict => ChecklistError::DuplicateCode(code.clone()),
                other => ChecklistError::Repository(other),
            })?;
            let created = self.engine.enter_initial_status(tx, &record, now)?;
            Ok::<_, ChecklistError>((record, created))
        })?;

        info!(
            case_id = record.id.0,
            code = %record.code,
            status = record.status.as_str(),
            created_requirements = created.len(),
            "case file created"
        );
        self.engine
            .record_status_change(&record, None, record.status, created.len(), now);

        Ok(CaseFileCreated {
            case: record,
            created_requirements: created.iter().map(CreatedRequirementView::from).collect(),
        })
    }

    /// Applies field edits. Only files still being prepared can change.
    pub fn update(
        &self,
        id: CaseFileId,
        changes: CaseFileChanges,
    ) -> Result<CaseFile, ChecklistError> {
        if changes
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(ChecklistError::Invalid(
                "case file title must not be blank".to_string(),
            ));
        }

        let now = self.engine.clock().now();
        self.engine.store().atomically(|tx| {
            let mut case = tx
                .find_case(id)?
                .ok_or(ChecklistError::NotFound(Missing::CaseFile(id)))?;
            if !case.status.is_editable() {
                return Err(ChecklistError::NotEditable {
                    status: case.status,
                });
            }
            case.apply(changes);
            case.updated_at = now;
            tx.update_case(&case)?;
            Ok(case)
        })
    }

    /// Soft-deletes a draft case file. Its requirements stay stored but unreachable.
    pub fn delete(&self, id: CaseFileId) -> Result<(), ChecklistError> {
        let now = self.engine.clock().now();
        self.engine.store().atomically(|tx| {
            let case = tx
                .find_case(id)?
                .ok_or(ChecklistError::NotFound(Missing::CaseFile(id)))?;
            if !case.status.is_deletable() {
                return Err(ChecklistError::InvalidState {
                    status: case.status,
                });
            }
            tx.soft_delete_case(id, now)?;
            Ok(())
        })?;

        info!(case_id = id.0, "case file deleted");
        Ok(())
    }

    pub fn change_status(
        &self,
        id: CaseFileId,
        status: CaseStatus,
    ) -> Result<StatusChangeReport, ChecklistError> {
        self.engine.process_status_change(id, status)
    }

    pub fn get(&self, id: CaseFileId) -> Result<CaseFileDetail, ChecklistError> {
        let (case, requirements) = self
            .engine
            .store()
            .find_case_with_requirements(id)?
            .ok_or(ChecklistError::NotFound(Missing::CaseFile(id)))?;

        Ok(CaseFileDetail {
            status_label: case.status.label(),
            editable: case.status.is_editable(),
            next_statuses: self.engine.graph().next_states(case.status).to_vec(),
            case,
            requirements,
        })
    }

    pub fn list(&self, filter: &CaseFileFilter) -> Result<Vec<CaseFile>, ChecklistError> {
        Ok(self.engine.store().list_cases(filter)?)
    }
}
