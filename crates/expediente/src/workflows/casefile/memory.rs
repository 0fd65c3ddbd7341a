//! In-memory storage backend.
//!
//! Units of work hold the state lock for their whole duration and operate on a cloned copy that
//! replaces the live state only when the closure succeeds.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{
    CaseFile, CaseFileFilter, CaseFileId, CaseStatus, CaseType, NewCaseFile, RequirementId,
    TemplateId,
};
use super::repository::{
    CaseFileRepository, ChecklistRepositories, ChecklistStore, RepositoryError,
    RequirementRepository, RequirementScope, TemplateRepository,
};
use super::requirements::{NewRequirement, Requirement, RequirementTemplate, TemplateDraft};

#[derive(Debug, Clone, Default)]
struct StoreState {
    cases: BTreeMap<CaseFileId, CaseFile>,
    templates: BTreeMap<TemplateId, RequirementTemplate>,
    requirements: BTreeMap<RequirementId, Requirement>,
    last_case_id: u64,
    last_template_id: u64,
    last_requirement_id: u64,
}

impl StoreState {
    fn live_case(&self, id: CaseFileId) -> Option<&CaseFile> {
        self.cases.get(&id).filter(|case| !case.is_deleted())
    }

    fn live_case_mut(&mut self, id: CaseFileId) -> Option<&mut CaseFile> {
        self.cases.get_mut(&id).filter(|case| !case.is_deleted())
    }

    fn live_template(&self, id: TemplateId) -> Option<&RequirementTemplate> {
        self.templates
            .get(&id)
            .filter(|template| template.deleted_at.is_none())
    }

    fn live_requirement(&self, id: RequirementId) -> Option<&Requirement> {
        self.requirements
            .get(&id)
            .filter(|requirement| self.live_case(requirement.case_id).is_some())
    }

    fn case_requirements(&self, case_id: CaseFileId) -> Vec<Requirement> {
        if self.live_case(case_id).is_none() {
            return Vec::new();
        }
        self.requirements
            .values()
            .filter(|requirement| requirement.case_id == case_id)
            .cloned()
            .collect()
    }

    fn build_requirement(&mut self, requirement: NewRequirement, at: DateTime<Utc>) -> Requirement {
        self.last_requirement_id += 1;
        let NewRequirement {
            case_id,
            name,
            description,
            target_entity,
            due_date,
            mandatory,
            template_id,
        } = requirement;

        Requirement {
            id: RequirementId(self.last_requirement_id),
            case_id,
            name,
            description,
            target_entity,
            due_date,
            is_completed: false,
            is_mandatory: mandatory,
            completed_at: None,
            notified_at: None,
            template_id,
            created_at: at,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// The live state is only replaced after a unit of work succeeds, so a guard poisoned by a
    /// panicking closure still holds the last committed state.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn into_state(self) -> StoreState {
        self.state.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChecklistStore for MemoryStore {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ChecklistRepositories) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut live = self.lock();
        let staged = MemoryStore::from_state(live.clone());
        let value = work(&staged)?;
        *live = staged.into_state();
        Ok(value)
    }
}

impl CaseFileRepository for MemoryStore {
    fn find_case(&self, id: CaseFileId) -> Result<Option<CaseFile>, RepositoryError> {
        Ok(self.lock().live_case(id).cloned())
    }

    fn find_case_by_code(&self, code: &str) -> Result<Option<CaseFile>, RepositoryError> {
        Ok(self
            .lock()
            .cases
            .values()
            .find(|case| !case.is_deleted() && case.code == code)
            .cloned())
    }

    fn find_case_with_requirements(
        &self,
        id: CaseFileId,
    ) -> Result<Option<(CaseFile, Vec<Requirement>)>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .live_case(id)
            .cloned()
            .map(|case| (case, state.case_requirements(id))))
    }

    fn list_cases(&self, filter: &CaseFileFilter) -> Result<Vec<CaseFile>, RepositoryError> {
        Ok(self
            .lock()
            .cases
            .values()
            .filter(|case| !case.is_deleted() && filter.matches(case))
            .cloned()
            .collect())
    }

    fn insert_case(&self, case: NewCaseFile, at: DateTime<Utc>) -> Result<CaseFile, RepositoryError> {
        let mut state = self.lock();
        // Codes stay reserved by soft-deleted files too.
        if state.cases.values().any(|existing| existing.code == case.code) {
            return Err(RepositoryError::Conflict);
        }

        state.last_case_id += 1;
        let NewCaseFile {
            code,
            campaign,
            case_type,
            title,
            status,
            job,
            employer_id,
            worker_id,
            manager_id,
        } = case;

        let record = CaseFile {
            id: CaseFileId(state.last_case_id),
            code,
            campaign,
            case_type,
            title,
            status: status.unwrap_or(CaseStatus::Draft),
            job,
            employer_id,
            worker_id,
            manager_id,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        };
        state.cases.insert(record.id, record.clone());
        Ok(record)
    }

    fn update_case(&self, case: &CaseFile) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let stored = state
            .live_case_mut(case.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = case.clone();
        Ok(())
    }

    fn update_case_status(
        &self,
        id: CaseFileId,
        status: CaseStatus,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let stored = state.live_case_mut(id).ok_or(RepositoryError::NotFound)?;
        stored.status = status;
        stored.updated_at = at;
        Ok(())
    }

    fn soft_delete_case(&self, id: CaseFileId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let stored = state.live_case_mut(id).ok_or(RepositoryError::NotFound)?;
        stored.deleted_at = Some(at);
        stored.updated_at = at;
        Ok(())
    }
}

impl TemplateRepository for MemoryStore {
    fn find_template(&self, id: TemplateId) -> Result<Option<RequirementTemplate>, RepositoryError> {
        Ok(self.lock().live_template(id).cloned())
    }

    fn list_templates(&self) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        Ok(self
            .lock()
            .templates
            .values()
            .filter(|template| template.deleted_at.is_none())
            .cloned()
            .collect())
    }

    fn find_applicable_templates(
        &self,
        case_type: CaseType,
        status: CaseStatus,
        include_manual: bool,
    ) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        Ok(self
            .lock()
            .templates
            .values()
            .filter(|template| {
                template.deleted_at.is_none()
                    && template.applies_to(case_type, status, include_manual)
            })
            .cloned()
            .collect())
    }

    fn insert_template(&self, draft: TemplateDraft) -> Result<RequirementTemplate, RepositoryError> {
        let mut state = self.lock();
        state.last_template_id += 1;
        let TemplateDraft {
            name,
            description,
            target_entity,
            case_type,
            trigger_status,
            days_to_expire,
            mandatory,
        } = draft;

        let template = RequirementTemplate {
            id: TemplateId(state.last_template_id),
            name,
            description,
            target_entity,
            case_type,
            trigger_status,
            days_to_expire,
            mandatory,
            deleted_at: None,
        };
        state.templates.insert(template.id, template.clone());
        Ok(template)
    }

    fn update_template(&self, template: &RequirementTemplate) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        match state.templates.get_mut(&template.id) {
            Some(stored) if stored.deleted_at.is_none() => {
                *stored = template.clone();
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn soft_delete_template(&self, id: TemplateId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        match state.templates.get_mut(&id) {
            Some(stored) if stored.deleted_at.is_none() => {
                stored.deleted_at = Some(at);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}

impl RequirementRepository for MemoryStore {
    fn find_requirement(&self, id: RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        Ok(self.lock().live_requirement(id).cloned())
    }

    fn requirements_for_case(
        &self,
        case_id: CaseFileId,
        scope: RequirementScope,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        let requirements = self.lock().case_requirements(case_id);
        Ok(match scope {
            RequirementScope::All => requirements,
            RequirementScope::Pending => requirements
                .into_iter()
                .filter(Requirement::is_pending)
                .collect(),
        })
    }

    fn insert_requirement(
        &self,
        requirement: NewRequirement,
        at: DateTime<Utc>,
    ) -> Result<Requirement, RepositoryError> {
        let mut state = self.lock();
        if state.live_case(requirement.case_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let record = state.build_requirement(requirement, at);
        state.requirements.insert(record.id, record.clone());
        Ok(record)
    }

    fn insert_requirements(
        &self,
        requirements: Vec<NewRequirement>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        let mut state = self.lock();
        if requirements
            .iter()
            .any(|requirement| state.live_case(requirement.case_id).is_none())
        {
            return Err(RepositoryError::NotFound);
        }

        let records: Vec<Requirement> = requirements
            .into_iter()
            .map(|requirement| state.build_requirement(requirement, at))
            .collect();
        for record in &records {
            state.requirements.insert(record.id, record.clone());
        }
        Ok(records)
    }

    fn update_requirement(&self, requirement: &Requirement) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if state.live_requirement(requirement.id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.requirements.insert(requirement.id, requirement.clone());
        Ok(())
    }

    fn delete_requirement(&self, id: RequirementId) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if state.live_requirement(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.requirements.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::casefile::domain::JobOffer;

    fn new_case(code: &str) -> NewCaseFile {
        NewCaseFile {
            code: code.to_string(),
            campaign: Some("2025".to_string()),
            case_type: CaseType::Seasonal,
            title: "Berry picking".to_string(),
            status: None,
            job: JobOffer::default(),
            employer_id: None,
            worker_id: None,
            manager_id: None,
        }
    }

    fn manual(case_id: CaseFileId, name: &str) -> NewRequirement {
        NewRequirement {
            case_id,
            name: name.to_string(),
            description: None,
            target_entity: None,
            due_date: None,
            mandatory: false,
            template_id: None,
        }
    }

    #[test]
    fn insert_case_defaults_to_draft_and_rejects_duplicate_codes() {
        let store = MemoryStore::new();
        let case = store
            .insert_case(new_case("EXP-1"), Utc::now())
            .expect("insert succeeds");
        assert_eq!(case.status, CaseStatus::Draft);
        assert_eq!(case.id, CaseFileId(1));

        let err = store
            .insert_case(new_case("EXP-1"), Utc::now())
            .expect_err("duplicate code");
        assert_eq!(err, RepositoryError::Conflict);
    }

    #[test]
    fn soft_deleted_cases_are_hidden_from_reads() {
        let store = MemoryStore::new();
        let case = store
            .insert_case(new_case("EXP-2"), Utc::now())
            .expect("insert succeeds");
        store
            .soft_delete_case(case.id, Utc::now())
            .expect("delete succeeds");

        assert!(store.find_case(case.id).expect("read").is_none());
        assert!(store.find_case_by_code("EXP-2").expect("read").is_none());
        assert!(store
            .list_cases(&CaseFileFilter::default())
            .expect("list")
            .is_empty());
        assert_eq!(
            store.update_case_status(case.id, CaseStatus::PendingReview, Utc::now()),
            Err(RepositoryError::NotFound)
        );
    }

    #[test]
    fn failed_unit_of_work_discards_staged_writes() {
        let store = MemoryStore::new();
        let case = store
            .insert_case(new_case("EXP-3"), Utc::now())
            .expect("insert succeeds");

        let result: Result<(), RepositoryError> = store.atomically(|tx| {
            tx.update_case_status(case.id, CaseStatus::PendingReview, Utc::now())?;
            tx.insert_requirement(manual(case.id, "Passport"), Utc::now())?;
            Err(RepositoryError::Unavailable("forced".to_string()))
        });
        assert!(result.is_err());

        let (stored, requirements) = store
            .find_case_with_requirements(case.id)
            .expect("read")
            .expect("case present");
        assert_eq!(stored.status, CaseStatus::Draft);
        assert!(requirements.is_empty());
    }

    #[test]
    fn successful_unit_of_work_commits_every_write() {
        let store = MemoryStore::new();
        let case = store
            .insert_case(new_case("EXP-4"), Utc::now())
            .expect("insert succeeds");

        let created = store
            .atomically(|tx| {
                tx.update_case_status(case.id, CaseStatus::PendingReview, Utc::now())?;
                tx.insert_requirements(
                    vec![manual(case.id, "Passport"), manual(case.id, "Photo")],
                    Utc::now(),
                )
            })
            .expect("commit");
        assert_eq!(created.len(), 2);

        let pending = store
            .requirements_for_case(case.id, RequirementScope::Pending)
            .expect("read");
        assert_eq!(pending.len(), 2);
        assert_eq!(
            store.find_case(case.id).expect("read").map(|case| case.status),
            Some(CaseStatus::PendingReview)
        );
    }

    #[test]
    fn batch_insert_rejects_unknown_cases_without_partial_rows() {
        let store = MemoryStore::new();
        let case = store
            .insert_case(new_case("EXP-5"), Utc::now())
            .expect("insert succeeds");

        let err = store
            .insert_requirements(
                vec![manual(case.id, "Passport"), manual(CaseFileId(99), "Ghost")],
                Utc::now(),
            )
            .expect_err("unknown case");
        assert_eq!(err, RepositoryError::NotFound);
        assert!(store
            .requirements_for_case(case.id, RequirementScope::All)
            .expect("read")
            .is_empty());
    }

    #[test]
    fn applicable_templates_skip_deleted_and_manual_entries() {
        let store = MemoryStore::new();
        let draft = |name: &str, trigger: Option<CaseStatus>| TemplateDraft {
            name: name.to_string(),
            description: None,
            target_entity: None,
            case_type: None,
            trigger_status: trigger,
            days_to_expire: None,
            mandatory: false,
        };
        store
            .insert_template(draft("Ready docs", Some(CaseStatus::Ready)))
            .expect("insert");
        let retired = store
            .insert_template(draft("Retired", Some(CaseStatus::Ready)))
            .expect("insert");
        store.insert_template(draft("Manual", None)).expect("insert");
        store
            .soft_delete_template(retired.id, Utc::now())
            .expect("delete");

        let automatic = store
            .find_applicable_templates(CaseType::Renewal, CaseStatus::Ready, false)
            .expect("query");
        assert_eq!(automatic.len(), 1);
        assert_eq!(automatic[0].name, "Ready docs");

        let with_manual = store
            .find_applicable_templates(CaseType::Renewal, CaseStatus::Ready, true)
            .expect("query");
        assert_eq!(with_manual.len(), 2);
    }

    #[test]
    fn panicking_unit_of_work_keeps_the_committed_state() {
        let store = MemoryStore::new();
        let case = store
            .insert_case(new_case("EXP-6"), Utc::now())
            .expect("insert succeeds");

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), RepositoryError> = store.atomically(|tx| {
                tx.update_case_status(case.id, CaseStatus::PendingReview, Utc::now())?;
                panic!("closure failed mid-transaction");
            });
        }));
        assert!(outcome.is_err());

        assert_eq!(
            store.find_case(case.id).expect("read").map(|case| case.status),
            Some(CaseStatus::Draft)
        );
        store
            .insert_requirement(manual(case.id, "Passport"), Utc::now())
            .expect("store still writable");
    }

    #[test]
    fn requirements_of_deleted_cases_are_hidden_and_frozen() {
        use crate::workflows::casefile::{
            ChecklistEngine, ChecklistError, FixedClock, Missing, TracingAuditSink,
        };
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::on(
            chrono::NaiveDate::from_ymd_opt(2025, 4, 7).expect("valid date"),
        ));
        let engine = ChecklistEngine::new(store.clone(), Arc::new(TracingAuditSink), clock);

        let case = store
            .insert_case(new_case("EXP-7"), Utc::now())
            .expect("insert succeeds");
        let requirement = store
            .insert_requirement(manual(case.id, "Passport"), Utc::now())
            .expect("insert succeeds");
        store
            .soft_delete_case(case.id, Utc::now())
            .expect("delete succeeds");

        assert_eq!(store.find_requirement(requirement.id).expect("read"), None);
        assert!(store
            .requirements_for_case(case.id, RequirementScope::All)
            .expect("read")
            .is_empty());

        let missing = |result: Result<_, ChecklistError>| {
            matches!(
                result,
                Err(ChecklistError::NotFound(Missing::Requirement(id))) if id == requirement.id
            )
        };
        assert!(missing(engine.complete_requirement(requirement.id).map(|_| ())));
        assert!(missing(engine.toggle_requirement(requirement.id).map(|_| ())));
        assert!(missing(engine.toggle_notified(requirement.id).map(|_| ())));
        assert!(missing(engine.delete_requirement(requirement.id)));

        let stored = store.lock().requirements.get(&requirement.id).cloned();
        assert_eq!(stored, Some(requirement));
    }
}
