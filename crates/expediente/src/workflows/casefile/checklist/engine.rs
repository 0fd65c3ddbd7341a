use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::super::audit::{AuditSink, StatusChangeEvent};
use super::super::clock::Clock;
use super::super::domain::{CaseFile, CaseFileId, CaseStatus, RequirementId};
use super::super::repository::{
    CaseFileRepository, ChecklistRepositories, ChecklistStore, RequirementRepository,
    RequirementScope, TemplateRepository,
};
use super::super::requirements::{ManualRequirement, Requirement};
use super::super::transitions::StatusGraph;
use super::error::{ChecklistError, Missing};
use super::expansion::{applied_template_ids, generate_requirements_from_templates};
use super::summary::{upcoming_due, ChecklistSummary};
use super::views::{
    CompletionOutcome, CreatedRequirementView, RegenerationReport, StatusChangeReport,
    UpcomingRequirementView,
};

/// Status-driven requirement generation and checklist bookkeeping for case files.
pub struct ChecklistEngine<S, A> {
    store: Arc<S>,
    audit: Arc<A>,
    clock: Arc<dyn Clock>,
    graph: Arc<StatusGraph>,
}

impl<S, A> ChecklistEngine<S, A>
where
    S: ChecklistStore + 'static,
    A: AuditSink + 'static,
{
    pub fn new(store: Arc<S>, audit: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self::with_graph(store, audit, clock, StatusGraph::standard())
    }

    pub fn with_graph(
        store: Arc<S>,
        audit: Arc<A>,
        clock: Arc<dyn Clock>,
        graph: StatusGraph,
    ) -> Self {
        Self {
            store,
            audit,
            clock,
            graph: Arc::new(graph),
        }
    }

    pub fn graph(&self) -> &StatusGraph {
        &self.graph
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn clock_handle(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validates the transition against the graph, then updates the status and expands the
    /// matching templates in one unit of work.
    pub fn process_status_change(
        &self,
        case_id: CaseFileId,
        new_status: CaseStatus,
    ) -> Result<StatusChangeReport, ChecklistError> {
        let now = self.clock.now();

        let (case, previous_status, created) = self.store.atomically(|tx| {
            let (case, existing) = load_case(tx, case_id)?;
            let previous_status = case.status;
            if !self.graph.allows(previous_status, new_status) {
                return Err(ChecklistError::IllegalTransition {
                    from: previous_status,
                    to: new_status,
                });
            }

            tx.update_case_status(case_id, new_status, now)?;
            let created =
                generate_requirements_from_templates(tx, &case, new_status, &existing, now)?;
            Ok((case, previous_status, created))
        })?;

        self.record_status_change(&case, Some(previous_status), new_status, created.len(), now);

        Ok(StatusChangeReport {
            case_id,
            code: case.code,
            previous_status,
            new_status,
            new_status_label: new_status.label(),
            created_requirements: created.iter().map(CreatedRequirementView::from).collect(),
        })
    }

    /// Runs template expansion for `status` without touching the case status.
    pub fn expand_templates(
        &self,
        case_id: CaseFileId,
        status: CaseStatus,
    ) -> Result<Vec<Requirement>, ChecklistError> {
        let now = self.clock.now();
        self.store.atomically(|tx| {
            let (case, existing) = load_case(tx, case_id)?;
            generate_requirements_from_templates(tx, &case, status, &existing, now)
        })
    }

    /// Catches a case up with the current template catalog for its status, including manual
    /// templates. Pending template-derived requirements get their name and description refreshed;
    /// completed ones are left alone.
    pub fn regenerate_requirements(
        &self,
        case_id: CaseFileId,
    ) -> Result<RegenerationReport, ChecklistError> {
        let now = self.clock.now();
        let today = now.date_naive();

        let report = self.store.atomically(|tx| {
            let (case, existing) = load_case(tx, case_id)?;
            let templates = tx.find_applicable_templates(case.case_type, case.status, true)?;
            let applied = applied_template_ids(&existing);

            let mut missing = Vec::new();
            let mut updated = 0;
            for template in &templates {
                if !applied.contains(&template.id) {
                    missing.push(template.instantiate(case.id, today)?);
                    continue;
                }

                for requirement in existing.iter().filter(|requirement| {
                    requirement.template_id == Some(template.id) && requirement.is_pending()
                }) {
                    if requirement.name == template.name
                        && requirement.description == template.description
                    {
                        continue;
                    }
                    let mut refreshed = requirement.clone();
                    refreshed.name = template.name.clone();
                    refreshed.description = template.description.clone();
                    tx.update_requirement(&refreshed)?;
                    updated += 1;
                }
            }

            let created = if missing.is_empty() {
                Vec::new()
            } else {
                tx.insert_requirements(missing, now)?
            };

            Ok::<_, ChecklistError>(RegenerationReport {
                case_id,
                status: case.status,
                created: created.len(),
                updated,
                created_requirements: created.iter().map(CreatedRequirementView::from).collect(),
            })
        })?;

        info!(
            case_id = case_id.0,
            created = report.created,
            updated = report.updated,
            "requirements regenerated"
        );
        Ok(report)
    }

    pub fn checklist_summary(&self, case_id: CaseFileId) -> Result<ChecklistSummary, ChecklistError> {
        let (_, requirements) = load_case(self.store.as_ref(), case_id)?;
        Ok(ChecklistSummary::from_requirements(
            case_id,
            &requirements,
            self.clock.today(),
        ))
    }

    pub fn list_requirements(
        &self,
        case_id: CaseFileId,
        scope: RequirementScope,
    ) -> Result<Vec<Requirement>, ChecklistError> {
        ensure_case(self.store.as_ref(), case_id)?;
        Ok(self.store.requirements_for_case(case_id, scope)?)
    }

    /// Marks a pending requirement as done and returns the refreshed checklist.
    pub fn complete_requirement(
        &self,
        id: RequirementId,
    ) -> Result<CompletionOutcome, ChecklistError> {
        let now = self.clock.now();
        let requirement = self.store.atomically(|tx| {
            let mut requirement = load_requirement(tx, id)?;
            if requirement.is_completed {
                return Err(ChecklistError::AlreadyCompleted { id });
            }
            requirement.complete(now);
            tx.update_requirement(&requirement)?;
            Ok(requirement)
        })?;

        debug!(requirement_id = id.0, case_id = requirement.case_id.0, "requirement completed");
        self.with_summary(requirement)
    }

    /// Flips completion in either direction, keeping `completed_at` in step.
    pub fn toggle_requirement(
        &self,
        id: RequirementId,
    ) -> Result<CompletionOutcome, ChecklistError> {
        let now = self.clock.now();
        let requirement = self.store.atomically(|tx| {
            let mut requirement = load_requirement(tx, id)?;
            requirement.toggle_completion(now);
            tx.update_requirement(&requirement)?;
            Ok::<_, ChecklistError>(requirement)
        })?;

        debug!(
            requirement_id = id.0,
            completed = requirement.is_completed,
            "requirement completion toggled"
        );
        self.with_summary(requirement)
    }

    pub fn toggle_notified(&self, id: RequirementId) -> Result<Requirement, ChecklistError> {
        let now = self.clock.now();
        self.store.atomically(|tx| {
            let mut requirement = load_requirement(tx, id)?;
            requirement.toggle_notified(now);
            tx.update_requirement(&requirement)?;
            Ok(requirement)
        })
    }

    pub fn add_manual_requirement(
        &self,
        case_id: CaseFileId,
        requirement: ManualRequirement,
    ) -> Result<Requirement, ChecklistError> {
        if requirement.name.trim().is_empty() {
            return Err(ChecklistError::Invalid(
                "requirement name must not be blank".to_string(),
            ));
        }

        let now = self.clock.now();
        let created = self.store.atomically(|tx| {
            ensure_case(tx, case_id)?;
            Ok::<_, ChecklistError>(tx.insert_requirement(requirement.into_new(case_id), now)?)
        })?;

        debug!(case_id = case_id.0, requirement_id = created.id.0, "manual requirement added");
        Ok(created)
    }

    /// Only pending manual requirements can be removed.
    pub fn delete_requirement(&self, id: RequirementId) -> Result<(), ChecklistError> {
        self.store.atomically(|tx| {
            let requirement = load_requirement(tx, id)?;
            if requirement.is_completed {
                return Err(ChecklistError::CannotDeleteCompleted { id });
            }
            if !requirement.is_manual() {
                return Err(ChecklistError::CannotDeleteTemplateDerived { id });
            }
            tx.delete_requirement(id)?;
            Ok(())
        })?;

        debug!(requirement_id = id.0, "manual requirement deleted");
        Ok(())
    }

    pub fn upcoming_due_requirements(
        &self,
        case_id: CaseFileId,
        days: i64,
    ) -> Result<Vec<UpcomingRequirementView>, ChecklistError> {
        ensure_case(self.store.as_ref(), case_id)?;
        let pending = self
            .store
            .requirements_for_case(case_id, RequirementScope::Pending)?;
        Ok(upcoming_due(&pending, self.clock.today(), days))
    }

    /// Expands templates for the status a freshly inserted case starts in. Entering the initial
    /// state is not a graph edge, so no transition check happens here.
    pub(crate) fn enter_initial_status(
        &self,
        tx: &dyn ChecklistRepositories,
        case: &CaseFile,
        now: DateTime<Utc>,
    ) -> Result<Vec<Requirement>, ChecklistError> {
        generate_requirements_from_templates(tx, case, case.status, &[], now)
    }

    /// Emits the audit event. Sink failures are logged and swallowed.
    pub(crate) fn record_status_change(
        &self,
        case: &CaseFile,
        previous_status: Option<CaseStatus>,
        new_status: CaseStatus,
        created_requirements: usize,
        occurred_at: DateTime<Utc>,
    ) {
        let event = StatusChangeEvent {
            case_id: case.id,
            code: case.code.clone(),
            previous_status,
            new_status,
            created_requirements,
            occurred_at,
        };

        if let Err(err) = self.audit.record(&event) {
            warn!(case_id = case.id.0, error = %err, "failed to record status change audit event");
        }
    }

    fn with_summary(&self, requirement: Requirement) -> Result<CompletionOutcome, ChecklistError> {
        let summary = self.checklist_summary(requirement.case_id)?;
        Ok(CompletionOutcome {
            requirement,
            summary,
        })
    }
}

fn load_case<R>(
    repositories: &R,
    case_id: CaseFileId,
) -> Result<(CaseFile, Vec<Requirement>), ChecklistError>
where
    R: ChecklistRepositories + ?Sized,
{
    repositories
        .find_case_with_requirements(case_id)?
        .ok_or(ChecklistError::NotFound(Missing::CaseFile(case_id)))
}

fn ensure_case<R>(repositories: &R, case_id: CaseFileId) -> Result<CaseFile, ChecklistError>
where
    R: ChecklistRepositories + ?Sized,
{
    repositories
        .find_case(case_id)?
        .ok_or(ChecklistError::NotFound(Missing::CaseFile(case_id)))
}

fn load_requirement<R>(repositories: &R, id: RequirementId) -> Result<Requirement, ChecklistError>
where
    R: ChecklistRepositories + ?Sized,
{
    repositories
        .find_requirement(id)?
        .ok_or(ChecklistError::NotFound(Missing::Requirement(id)))
}
