use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::casefile::audit::{AuditError, AuditSink, StatusChangeEvent};
use crate::workflows::casefile::clock::FixedClock;
use crate::workflows::casefile::domain::{
    CaseFile, CaseFileFilter, CaseFileId, CaseStatus, CaseType, JobOffer, NewCaseFile,
    RequirementId, TemplateId,
};
use crate::workflows::casefile::memory::MemoryStore;
use crate::workflows::casefile::repository::{
    CaseFileRepository, ChecklistRepositories, ChecklistStore, RepositoryError,
    RequirementRepository, RequirementScope, TemplateRepository,
};
use crate::workflows::casefile::requirements::{
    NewRequirement, Requirement, RequirementTemplate, TemplateDraft,
};
use crate::workflows::casefile::{
    casefile_router, CaseFileService, ChecklistEngine, TemplateRegistry, WorkflowServices,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date")
}

pub(super) fn new_case(code: &str, case_type: CaseType) -> NewCaseFile {
    NewCaseFile {
        code: code.to_string(),
        campaign: Some("2025".to_string()),
        case_type,
        title: format!("{} sponsorship", case_type.label()),
        status: None,
        job: JobOffer {
            title: Some("Farm labourer".to_string()),
            start_date: NaiveDate::from_ymd_opt(2025, 4, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 30),
            monthly_salary: Some(1_380),
            schedule: Some("40h/week".to_string()),
        },
        employer_id: None,
        worker_id: None,
        manager_id: None,
    }
}

pub(super) fn case_in(code: &str, status: CaseStatus) -> NewCaseFile {
    NewCaseFile {
        status: Some(status),
        ..new_case(code, CaseType::InitialEmployment)
    }
}

pub(super) fn template(name: &str, trigger: Option<CaseStatus>) -> TemplateDraft {
    TemplateDraft {
        name: name.to_string(),
        description: None,
        target_entity: None,
        case_type: None,
        trigger_status: trigger,
        days_to_expire: None,
        mandatory: false,
    }
}

/// Engine, services and fakes sharing one store and one clock.
pub(super) struct Harness<S = MemoryStore, A = RecordingAudit> {
    pub(super) store: Arc<S>,
    pub(super) audit: Arc<A>,
    pub(super) clock: Arc<FixedClock>,
    pub(super) engine: Arc<ChecklistEngine<S, A>>,
    pub(super) cases: CaseFileService<S, A>,
    pub(super) registry: TemplateRegistry<S>,
}

pub(super) fn harness() -> Harness {
    harness_with(Arc::new(MemoryStore::new()), Arc::new(RecordingAudit::default()))
}

pub(super) fn harness_with<S, A>(store: Arc<S>, audit: Arc<A>) -> Harness<S, A>
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    let clock = Arc::new(FixedClock::on(today()));
    let engine = Arc::new(ChecklistEngine::new(
        store.clone(),
        audit.clone(),
        clock.clone(),
    ));
    let cases = CaseFileService::new(engine.clone());
    let registry = TemplateRegistry::new(store.clone(), clock.clone());
    Harness {
        store,
        audit,
        clock,
        engine,
        cases,
        registry,
    }
}

impl<S, A> Harness<S, A>
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    pub(super) fn add_template(&self, draft: TemplateDraft) -> RequirementTemplate {
        self.registry.create(draft).expect("template created")
    }

    pub(super) fn open_case(&self, case: NewCaseFile) -> CaseFile {
        self.cases.create(case).expect("case created").case
    }

    pub(super) fn requirements(&self, case_id: CaseFileId) -> Vec<Requirement> {
        self.store
            .requirements_for_case(case_id, RequirementScope::All)
            .expect("requirements readable")
    }

    pub(super) fn status_of(&self, case_id: CaseFileId) -> CaseStatus {
        self.store
            .find_case(case_id)
            .expect("case readable")
            .expect("case present")
            .status
    }
}

pub(super) fn router_for(harness: &Harness) -> axum::Router {
    casefile_router(Arc::new(WorkflowServices::new(harness.engine.clone(), 7)))
}

#[derive(Debug, Default)]
pub(super) struct RecordingAudit {
    events: Mutex<Vec<StatusChangeEvent>>,
}

impl RecordingAudit {
    pub(super) fn events(&self) -> Vec<StatusChangeEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: &StatusChangeEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .expect("audit mutex poisoned")
            .push(event.clone());
        Ok(())
    }
}

pub(super) struct FailingAudit;

impl AuditSink for FailingAudit {
    fn record(&self, _event: &StatusChangeEvent) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("collector offline".to_string()))
    }
}

/// Store whose units of work fail on batch requirement inserts.
#[derive(Default)]
pub(super) struct FailingInsertStore {
    pub(super) inner: MemoryStore,
}

struct FailingInsertTx<'a> {
    inner: &'a dyn ChecklistRepositories,
}

fn insert_failure() -> RepositoryError {
    RepositoryError::Unavailable("bulk insert rejected".to_string())
}

impl ChecklistStore for FailingInsertStore {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ChecklistRepositories) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.inner
            .atomically(|tx| work(&FailingInsertTx { inner: tx }))
    }
}

impl CaseFileRepository for FailingInsertStore {
    fn find_case(&self, id: CaseFileId) -> Result<Option<CaseFile>, RepositoryError> {
        self.inner.find_case(id)
    }

    fn find_case_by_code(&self, code: &str) -> Result<Option<CaseFile>, RepositoryError> {
        self.inner.find_case_by_code(code)
    }

    fn find_case_with_requirements(
        &self,
        id: CaseFileId,
    ) -> Result<Option<(CaseFile, Vec<Requirement>)>, RepositoryError> {
        self.inner.find_case_with_requirements(id)
    }

    fn list_cases(&self, filter: &CaseFileFilter) -> Result<Vec<CaseFile>, RepositoryError> {
        self.inner.list_cases(filter)
    }

    fn insert_case(&self, case: NewCaseFile, at: DateTime<Utc>) -> Result<CaseFile, RepositoryError> {
        self.inner.insert_case(case, at)
    }

    fn update_case(&self, case: &CaseFile) -> Result<(), RepositoryError> {
        self.inner.update_case(case)
    }

    fn update_case_status(
        &self,
        id: CaseFileId,
        status: CaseStatus,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.update_case_status(id, status, at)
    }

    fn soft_delete_case(&self, id: CaseFileId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.inner.soft_delete_case(id, at)
    }
}

impl TemplateRepository for FailingInsertStore {
    fn find_template(&self, id: TemplateId) -> Result<Option<RequirementTemplate>, RepositoryError> {
        self.inner.find_template(id)
    }

    fn list_templates(&self) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        self.inner.list_templates()
    }

    fn find_applicable_templates(
        &self,
        case_type: CaseType,
        status: CaseStatus,
        include_manual: bool,
    ) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        self.inner
            .find_applicable_templates(case_type, status, include_manual)
    }

    fn insert_template(&self, draft: TemplateDraft) -> Result<RequirementTemplate, RepositoryError> {
        self.inner.insert_template(draft)
    }

    fn update_template(&self, template: &RequirementTemplate) -> Result<(), RepositoryError> {
        self.inner.update_template(template)
    }

    fn soft_delete_template(&self, id: TemplateId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.inner.soft_delete_template(id, at)
    }
}

impl RequirementRepository for FailingInsertStore {
    fn find_requirement(&self, id: RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        self.inner.find_requirement(id)
    }

    fn requirements_for_case(
        &self,
        case_id: CaseFileId,
        scope: RequirementScope,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.requirements_for_case(case_id, scope)
    }

    fn insert_requirement(
        &self,
        requirement: NewRequirement,
        at: DateTime<Utc>,
    ) -> Result<Requirement, RepositoryError> {
        self.inner.insert_requirement(requirement, at)
    }

    fn insert_requirements(
        &self,
        requirements: Vec<NewRequirement>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.insert_requirements(requirements, at)
    }

    fn update_requirement(&self, requirement: &Requirement) -> Result<(), RepositoryError> {
        self.inner.update_requirement(requirement)
    }

    fn delete_requirement(&self, id: RequirementId) -> Result<(), RepositoryError> {
        self.inner.delete_requirement(id)
    }
}

impl CaseFileRepository for FailingInsertTx<'_> {
    fn find_case(&self, id: CaseFileId) -> Result<Option<CaseFile>, RepositoryError> {
        self.inner.find_case(id)
    }

    fn find_case_by_code(&self, code: &str) -> Result<Option<CaseFile>, RepositoryError> {
        self.inner.find_case_by_code(code)
    }

    fn find_case_with_requirements(
        &self,
        id: CaseFileId,
    ) -> Result<Option<(CaseFile, Vec<Requirement>)>, RepositoryError> {
        self.inner.find_case_with_requirements(id)
    }

    fn list_cases(&self, filter: &CaseFileFilter) -> Result<Vec<CaseFile>, RepositoryError> {
        self.inner.list_cases(filter)
    }

    fn insert_case(&self, case: NewCaseFile, at: DateTime<Utc>) -> Result<CaseFile, RepositoryError> {
        self.inner.insert_case(case, at)
    }

    fn update_case(&self, case: &CaseFile) -> Result<(), RepositoryError> {
        self.inner.update_case(case)
    }

    fn update_case_status(
        &self,
        id: CaseFileId,
        status: CaseStatus,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.update_case_status(id, status, at)
    }

    fn soft_delete_case(&self, id: CaseFileId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.inner.soft_delete_case(id, at)
    }
}

impl TemplateRepository for FailingInsertTx<'_> {
    fn find_template(&self, id: TemplateId) -> Result<Option<RequirementTemplate>, RepositoryError> {
        self.inner.find_template(id)
    }

    fn list_templates(&self) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        self.inner.list_templates()
    }

    fn find_applicable_templates(
        &self,
        case_type: CaseType,
        status: CaseStatus,
        include_manual: bool,
    ) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        self.inner
            .find_applicable_templates(case_type, status, include_manual)
    }

    fn insert_template(&self, draft: TemplateDraft) -> Result<RequirementTemplate, RepositoryError> {
        self.inner.insert_template(draft)
    }

    fn update_template(&self, template: &RequirementTemplate) -> Result<(), RepositoryError> {
        self.inner.update_template(template)
    }

    fn soft_delete_template(&self, id: TemplateId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.inner.soft_delete_template(id, at)
    }
}

impl RequirementRepository for FailingInsertTx<'_> {
    fn find_requirement(&self, id: RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        self.inner.find_requirement(id)
    }

    fn requirements_for_case(
        &self,
        case_id: CaseFileId,
        scope: RequirementScope,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.requirements_for_case(case_id, scope)
    }

    fn insert_requirement(
        &self,
        requirement: NewRequirement,
        at: DateTime<Utc>,
    ) -> Result<Requirement, RepositoryError> {
        self.inner.insert_requirement(requirement, at)
    }

    fn insert_requirements(
        &self,
        _requirements: Vec<NewRequirement>,
        _at: DateTime<Utc>,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        Err(insert_failure())
    }

    fn update_requirement(&self, requirement: &Requirement) -> Result<(), RepositoryError> {
        self.inner.update_requirement(requirement)
    }

    fn delete_requirement(&self, id: RequirementId) -> Result<(), RepositoryError> {
        self.inner.delete_requirement(id)
    }
}

/// Store that fails every call, as if the backing database were down.
pub(super) struct UnavailableStore;

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl ChecklistStore for UnavailableStore {
    fn atomically<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ChecklistRepositories) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(E::from(unavailable()))
    }
}

impl CaseFileRepository for UnavailableStore {
    fn find_case(&self, _id: CaseFileId) -> Result<Option<CaseFile>, RepositoryError> {
        Err(unavailable())
    }

    fn find_case_by_code(&self, _code: &str) -> Result<Option<CaseFile>, RepositoryError> {
        Err(unavailable())
    }

    fn find_case_with_requirements(
        &self,
        _id: CaseFileId,
    ) -> Result<Option<(CaseFile, Vec<Requirement>)>, RepositoryError> {
        Err(unavailable())
    }

    fn list_cases(&self, _filter: &CaseFileFilter) -> Result<Vec<CaseFile>, RepositoryError> {
        Err(unavailable())
    }

    fn insert_case(
        &self,
        _case: NewCaseFile,
        _at: DateTime<Utc>,
    ) -> Result<CaseFile, RepositoryError> {
        Err(unavailable())
    }

    fn update_case(&self, _case: &CaseFile) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    fn update_case_status(
        &self,
        _id: CaseFileId,
        _status: CaseStatus,
        _at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    fn soft_delete_case(&self, _id: CaseFileId, _at: DateTime<Utc>) -> Result<(), RepositoryError> {
        Err(unavailable())
    }
}

impl TemplateRepository for UnavailableStore {
    fn find_template(&self, _id: TemplateId) -> Result<Option<RequirementTemplate>, RepositoryError> {
        Err(unavailable())
    }

    fn list_templates(&self) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        Err(unavailable())
    }

    fn find_applicable_templates(
        &self,
        _case_type: CaseType,
        _status: CaseStatus,
        _include_manual: bool,
    ) -> Result<Vec<RequirementTemplate>, RepositoryError> {
        Err(unavailable())
    }

    fn insert_template(&self, _draft: TemplateDraft) -> Result<RequirementTemplate, RepositoryError> {
        Err(unavailable())
    }

    fn update_template(&self, _template: &RequirementTemplate) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    fn soft_delete_template(
        &self,
        _id: TemplateId,
        _at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(unavailable())
    }
}

impl RequirementRepository for UnavailableStore {
    fn find_requirement(&self, _id: RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        Err(unavailable())
    }

    fn requirements_for_case(
        &self,
        _case_id: CaseFileId,
        _scope: RequirementScope,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        Err(unavailable())
    }

    fn insert_requirement(
        &self,
        _requirement: NewRequirement,
        _at: DateTime<Utc>,
    ) -> Result<Requirement, RepositoryError> {
        Err(unavailable())
    }

    fn insert_requirements(
        &self,
        _requirements: Vec<NewRequirement>,
        _at: DateTime<Utc>,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        Err(unavailable())
    }

    fn update_requirement(&self, _requirement: &Requirement) -> Result<(), RepositoryError> {
        Err(unavailable())
    }

    fn delete_requirement(&self, _id: RequirementId) -> Result<(), RepositoryError> {
        Err(unavailable())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn assert_rejection(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], Value::Bool(false));
    assert!(payload["message"].is_string());
    payload
}
