use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::audit::AuditSink;
use super::checklist::{ActionOutcome, ChecklistEngine, ChecklistError};
use super::domain::{
    CaseFileChanges, CaseFileFilter, CaseFileId, CaseStatus, NewCaseFile, RequirementId, TemplateId,
};
use super::registry::TemplateRegistry;
use super::repository::{ChecklistStore, RequirementScope};
use super::requirements::{ManualRequirement, TemplateDraft};
use super::service::CaseFileService;

/// Shared handles behind the case-file HTTP surface.
pub struct WorkflowServices<S, A> {
    pub engine: Arc<ChecklistEngine<S, A>>,
    pub cases: Arc<CaseFileService<S, A>>,
    pub templates: Arc<TemplateRegistry<S>>,
    /// Window used by the upcoming-due endpoint when the query omits `days`.
    pub upcoming_days: i64,
}

impl<S, A> WorkflowServices<S, A>
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    pub fn new(engine: Arc<ChecklistEngine<S, A>>, upcoming_days: i64) -> Self {
        let cases = Arc::new(CaseFileService::new(engine.clone()));
        let templates = Arc::new(TemplateRegistry::new(
            engine.store().clone(),
            engine.clock_handle(),
        ));
        Self {
            engine,
            cases,
            templates,
            upcoming_days,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChangeRequest {
    pub(crate) status: CaseStatus,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpcomingQuery {
    #[serde(default)]
    pub(crate) days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RequirementListQuery {
    #[serde(default)]
    pub(crate) pending: bool,
}

/// Router builder exposing the case-file, checklist and template endpoints.
pub fn casefile_router<S, A>(services: Arc<WorkflowServices<S, A>>) -> Router
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/case-files",
            post(create_case_handler::<S, A>).get(list_cases_handler::<S, A>),
        )
        .route(
            "/api/v1/case-files/:case_id",
            get(get_case_handler::<S, A>)
                .put(update_case_handler::<S, A>)
                .patch(update_case_handler::<S, A>)
                .delete(delete_case_handler::<S, A>),
        )
        .route(
            "/api/v1/case-files/:case_id/status",
            post(change_status_handler::<S, A>),
        )
        .route(
            "/api/v1/case-files/:case_id/checklist",
            get(checklist_summary_handler::<S, A>),
        )
        .route(
            "/api/v1/case-files/:case_id/requirements",
            get(list_requirements_handler::<S, A>).post(add_manual_requirement_handler::<S, A>),
        )
        .route(
            "/api/v1/case-files/:case_id/requirements/upcoming",
            get(upcoming_requirements_handler::<S, A>),
        )
        .route(
            "/api/v1/case-files/:case_id/requirements/regenerate",
            post(regenerate_requirements_handler::<S, A>),
        )
        .route(
            "/api/v1/requirements/:requirement_id",
            axum::routing::delete(delete_requirement_handler::<S, A>),
        )
        .route(
            "/api/v1/requirements/:requirement_id/complete",
            post(complete_requirement_handler::<S, A>),
        )
        .route(
            "/api/v1/requirements/:requirement_id/toggle",
            post(toggle_requirement_handler::<S, A>),
        )
        .route(
            "/api/v1/requirements/:requirement_id/notify",
            post(toggle_notified_handler::<S, A>),
        )
        .route(
            "/api/v1/templates",
            get(list_templates_handler::<S, A>).post(create_template_handler::<S, A>),
        )
        .route(
            "/api/v1/templates/:template_id",
            get(get_template_handler::<S, A>)
                .put(update_template_handler::<S, A>)
                .delete(delete_template_handler::<S, A>),
        )
        .route(
            "/api/v1/workflow/statuses",
            get(workflow_statuses_handler::<S, A>),
        )
        .with_state(services)
}

type Services<S, A> = State<Arc<WorkflowServices<S, A>>>;

pub(crate) async fn create_case_handler<S, A>(
    State(services): Services<S, A>,
    Json(case): Json<NewCaseFile>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.cases.create(case) {
        Ok(created) => {
            let message = format!(
                "Case file '{}' created; {} requirement(s) generated",
                created.case.code,
                created.created_requirements.len()
            );
            outcome(StatusCode::CREATED, message, created)
        }
        Err(err) => rejection(err),
    }
}

pub(crate) async fn list_cases_handler<S, A>(
    State(services): Services<S, A>,
    Query(filter): Query<CaseFileFilter>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.cases.list(&filter) {
        Ok(cases) => (StatusCode::OK, Json(cases)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn get_case_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.cases.get(CaseFileId(case_id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn update_case_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
    Json(changes): Json<CaseFileChanges>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.cases.update(CaseFileId(case_id), changes) {
        Ok(case) => (StatusCode::OK, Json(case)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn delete_case_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.cases.delete(CaseFileId(case_id)) {
        Ok(()) => acknowledged("Case file deleted"),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn change_status_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
    Json(request): Json<StatusChangeRequest>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services
        .engine
        .process_status_change(CaseFileId(case_id), request.status)
    {
        Ok(report) => outcome(StatusCode::OK, report.message(), report),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn checklist_summary_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.engine.checklist_summary(CaseFileId(case_id)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn list_requirements_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
    Query(query): Query<RequirementListQuery>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    let scope = if query.pending {
        RequirementScope::Pending
    } else {
        RequirementScope::All
    };
    match services.engine.list_requirements(CaseFileId(case_id), scope) {
        Ok(requirements) => (StatusCode::OK, Json(requirements)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn add_manual_requirement_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
    Json(requirement): Json<ManualRequirement>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services
        .engine
        .add_manual_requirement(CaseFileId(case_id), requirement)
    {
        Ok(created) => outcome(StatusCode::CREATED, "Requirement added", created),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn upcoming_requirements_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
    Query(query): Query<UpcomingQuery>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    let days = query.days.unwrap_or(services.upcoming_days);
    if days < 0 {
        return rejection(ChecklistError::Invalid(
            "days must not be negative".to_string(),
        ));
    }
    match services
        .engine
        .upcoming_due_requirements(CaseFileId(case_id), days)
    {
        Ok(upcoming) => (StatusCode::OK, Json(upcoming)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn regenerate_requirements_handler<S, A>(
    State(services): Services<S, A>,
    Path(case_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.engine.regenerate_requirements(CaseFileId(case_id)) {
        Ok(report) => outcome(StatusCode::OK, report.message(), report),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn complete_requirement_handler<S, A>(
    State(services): Services<S, A>,
    Path(requirement_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services
        .engine
        .complete_requirement(RequirementId(requirement_id))
    {
        Ok(completed) => outcome(StatusCode::OK, "Requirement completed", completed),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn toggle_requirement_handler<S, A>(
    State(services): Services<S, A>,
    Path(requirement_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.engine.toggle_requirement(RequirementId(requirement_id)) {
        Ok(toggled) => {
            let message = if toggled.requirement.is_completed {
                "Requirement completed"
            } else {
                "Requirement reopened"
            };
            outcome(StatusCode::OK, message, toggled)
        }
        Err(err) => rejection(err),
    }
}

pub(crate) async fn toggle_notified_handler<S, A>(
    State(services): Services<S, A>,
    Path(requirement_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.engine.toggle_notified(RequirementId(requirement_id)) {
        Ok(requirement) => {
            let message = if requirement.notified_at.is_some() {
                "Requirement marked as notified"
            } else {
                "Notification cleared"
            };
            outcome(StatusCode::OK, message, requirement)
        }
        Err(err) => rejection(err),
    }
}

pub(crate) async fn delete_requirement_handler<S, A>(
    State(services): Services<S, A>,
    Path(requirement_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services
        .engine
        .delete_requirement(RequirementId(requirement_id))
    {
        Ok(()) => acknowledged("Requirement deleted"),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn list_templates_handler<S, A>(State(services): Services<S, A>) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.templates.list() {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn create_template_handler<S, A>(
    State(services): Services<S, A>,
    Json(draft): Json<TemplateDraft>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.templates.create(draft) {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn get_template_handler<S, A>(
    State(services): Services<S, A>,
    Path(template_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.templates.get(TemplateId(template_id)) {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn update_template_handler<S, A>(
    State(services): Services<S, A>,
    Path(template_id): Path<u64>,
    Json(draft): Json<TemplateDraft>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.templates.update(TemplateId(template_id), draft) {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn delete_template_handler<S, A>(
    State(services): Services<S, A>,
    Path(template_id): Path<u64>,
) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    match services.templates.delete(TemplateId(template_id)) {
        Ok(()) => acknowledged("Requirement template deleted"),
        Err(err) => rejection(err),
    }
}

pub(crate) async fn workflow_statuses_handler<S, A>(State(services): Services<S, A>) -> Response
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    let graph = services.engine.graph();
    let payload = json!({
        "initial": graph.initial(),
        "statuses": graph.describe(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

fn outcome<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    (status, Json(ActionOutcome::succeeded(message, data))).into_response()
}

fn acknowledged(message: &str) -> Response {
    let payload = json!({
        "success": true,
        "message": message,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) fn rejection_status(err: &ChecklistError) -> StatusCode {
    match err {
        ChecklistError::NotFound(_) => StatusCode::NOT_FOUND,
        ChecklistError::IllegalTransition { .. }
        | ChecklistError::NotEditable { .. }
        | ChecklistError::InvalidState { .. }
        | ChecklistError::AlreadyCompleted { .. }
        | ChecklistError::CannotDeleteCompleted { .. }
        | ChecklistError::CannotDeleteTemplateDerived { .. }
        | ChecklistError::DuplicateCode(_) => StatusCode::CONFLICT,
        ChecklistError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ChecklistError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn rejection(err: ChecklistError) -> Response {
    let status = rejection_status(&err);
    if err.is_infrastructure() {
        error!(error = %err, "checklist storage failure");
    }
    let payload = json!({
        "success": false,
        "message": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
