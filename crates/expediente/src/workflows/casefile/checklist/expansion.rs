use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::super::domain::{CaseFile, CaseStatus, TemplateId};
use super::super::repository::{ChecklistRepositories, RequirementRepository, TemplateRepository};
use super::super::requirements::{NewRequirement, Requirement};
use super::error::ChecklistError;

/// Materializes every transition-fired template matching `(case.case_type, status)` that has not
/// already produced a requirement on this case. Re-running with the same inputs inserts nothing.
pub(crate) fn generate_requirements_from_templates(
    tx: &dyn ChecklistRepositories,
    case: &CaseFile,
    status: CaseStatus,
    existing: &[Requirement],
    now: DateTime<Utc>,
) -> Result<Vec<Requirement>, ChecklistError> {
    let templates = tx.find_applicable_templates(case.case_type, status, false)?;
    let applied = applied_template_ids(existing);
    let today = now.date_naive();

    let pending: Vec<NewRequirement> = templates
        .iter()
        .filter(|template| !applied.contains(&template.id))
        .map(|template| template.instantiate(case.id, today))
        .collect::<Result<_, _>>()?;

    if pending.is_empty() {
        return Ok(Vec::new());
    }

    Ok(tx.insert_requirements(pending, now)?)
}

pub(crate) fn applied_template_ids(existing: &[Requirement]) -> HashSet<TemplateId> {
    existing
        .iter()
        .filter_map(|requirement| requirement.template_id)
        .collect()
}
