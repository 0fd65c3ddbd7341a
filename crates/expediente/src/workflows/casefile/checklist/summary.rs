use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use super::super::domain::{CaseFileId, TargetEntity};
use super::super::requirements::Requirement;
use super::views::UpcomingRequirementView;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityProgressEntry {
    pub target_entity: TargetEntity,
    pub label: &'static str,
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Read-side projection of one case's checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistSummary {
    pub case_id: CaseFileId,
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub mandatory_pending: usize,
    pub overdue: usize,
    pub completion_percentage: f64,
    pub ready_for_documents: bool,
    pub by_entity: Vec<EntityProgressEntry>,
}

#[derive(Debug, Default, Clone)]
struct EntityProgress {
    total: usize,
    completed: usize,
}

impl ChecklistSummary {
    /// Requirements without a target entity are counted under [`TargetEntity::General`].
    pub fn from_requirements(
        case_id: CaseFileId,
        requirements: &[Requirement],
        today: NaiveDate,
    ) -> Self {
        let mut per_entity: HashMap<TargetEntity, EntityProgress> = HashMap::new();
        let mut completed = 0;
        let mut mandatory_pending = 0;
        let mut overdue = 0;

        for requirement in requirements {
            let entry = per_entity
                .entry(requirement.target_entity.unwrap_or(TargetEntity::General))
                .or_default();
            entry.total += 1;

            if requirement.is_completed {
                completed += 1;
                entry.completed += 1;
            } else if requirement.is_mandatory {
                mandatory_pending += 1;
            }

            if requirement.is_overdue(today) {
                overdue += 1;
            }
        }

        let total = requirements.len();
        let by_entity = TargetEntity::ordered()
            .into_iter()
            .filter_map(|entity| {
                per_entity.get(&entity).map(|progress| EntityProgressEntry {
                    target_entity: entity,
                    label: entity.label(),
                    total: progress.total,
                    completed: progress.completed,
                    pending: progress.total - progress.completed,
                })
            })
            .collect();

        Self {
            case_id,
            total,
            completed,
            pending: total - completed,
            mandatory_pending,
            overdue,
            completion_percentage: completion_percentage(completed, total),
            ready_for_documents: mandatory_pending == 0,
            by_entity,
        }
    }
}

/// Percentage rounded to one decimal; zero for an empty checklist.
pub fn completion_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = completed as f64 / total as f64 * 100.0;
    (ratio * 10.0).round() / 10.0
}

/// Pending requirements due within `[0, days]` days of `today`, in storage order.
pub fn upcoming_due(
    requirements: &[Requirement],
    today: NaiveDate,
    days: i64,
) -> Vec<UpcomingRequirementView> {
    requirements
        .iter()
        .filter(|requirement| requirement.is_pending())
        .filter_map(|requirement| {
            let due_date = requirement.due_date?;
            let days_remaining = (due_date - today).num_days();
            (0..=days)
                .contains(&days_remaining)
                .then(|| UpcomingRequirementView {
                    id: requirement.id,
                    name: requirement.name.clone(),
                    target_entity: requirement.target_entity,
                    due_date,
                    days_remaining,
                    mandatory: requirement.is_mandatory,
                    template_id: requirement.template_id,
                    notified_at: requirement.notified_at,
                })
        })
        .collect()
}
