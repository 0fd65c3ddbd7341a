use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use expediente::error::AppError;
use expediente::workflows::casefile::{
    ActionOutcome, CaseFileId, CaseStatus, CaseType, ChecklistBlueprint, ChecklistEngine,
    ChecklistSummary, CreatedRequirementView, FixedClock, JobOffer, ManualRequirement,
    MemoryStore, NewCaseFile, RequirementScope, StatusGraph, TemplateCatalogImporter,
    TemplateDraft, TracingAuditSink, WorkflowServices,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Procedure of the sample case file
    #[arg(long, default_value = "seasonal")]
    pub(crate) case_type: CaseType,
    /// Date the demo starts on (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct TemplateImportArgs {
    /// CSV catalog with name, description, target_entity, case_type, trigger_status,
    /// days_to_expire and mandatory columns
    pub(crate) path: PathBuf,
}

type DemoServices = WorkflowServices<MemoryStore, TracingAuditSink>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { case_type, today } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let clock = Arc::new(FixedClock::on(today));
    let engine = Arc::new(ChecklistEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(TracingAuditSink),
        clock.clone(),
    ));
    let services = WorkflowServices::new(engine, 7);
    let seeded = services.templates.seed_standard()?;

    println!("Case file checklist demo");
    println!(
        "Procedure: {} | start date {} | {} templates in catalog",
        case_type.label(),
        today,
        seeded.len()
    );

    let created = services.cases.create(NewCaseFile {
        code: format!("DEMO-{}-0001", today.format("%Y")),
        campaign: Some(today.format("%Y").to_string()),
        case_type,
        title: format!("{} demo file", case_type.label()),
        status: None,
        job: JobOffer {
            title: Some("Agricultural labourer".to_string()),
            start_date: Some(today + Duration::days(60)),
            end_date: Some(today + Duration::days(240)),
            monthly_salary: Some(1_380),
            schedule: Some("40h/week".to_string()),
        },
        employer_id: None,
        worker_id: None,
        manager_id: None,
    })?;
    let case_id = created.case.id;
    println!(
        "\nOpened {} in '{}'",
        created.case.code,
        created.case.status.label()
    );
    render_created(&created.created_requirements);

    services.engine.add_manual_requirement(
        case_id,
        ManualRequirement::named("Upload signed job offer")
            .mandatory()
            .due_on(today + Duration::days(3)),
    )?;
    render_summary(&services.engine.checklist_summary(case_id)?);

    // Skipping review is not an edge of the workflow.
    let skipped = ActionOutcome::settle(
        services
            .engine
            .process_status_change(case_id, CaseStatus::Submitted),
        |report| report.message(),
    )?;
    println!(
        "\nAttempted draft -> submitted: {} ({})",
        if skipped.success { "accepted" } else { "rejected" },
        skipped.message
    );

    advance(&services, case_id, CaseStatus::PendingReview)?;
    complete_pending(&services, case_id)?;
    render_summary(&services.engine.checklist_summary(case_id)?);

    clock.advance(Duration::days(5));
    advance(&services, case_id, CaseStatus::Ready)?;

    let upcoming = services.engine.upcoming_due_requirements(case_id, 7)?;
    if upcoming.is_empty() {
        println!("\nDue within 7 days: none");
    } else {
        println!("\nDue within 7 days");
        for requirement in &upcoming {
            println!(
                "- {} (due {}, {} day(s) left)",
                requirement.name, requirement.due_date, requirement.days_remaining
            );
        }
    }

    complete_pending(&services, case_id)?;
    clock.advance(Duration::days(2));
    for status in [
        CaseStatus::Submitted,
        CaseStatus::Required,
        CaseStatus::Submitted,
        CaseStatus::Favorable,
    ] {
        advance(&services, case_id, status)?;
    }

    render_summary(&services.engine.checklist_summary(case_id)?);
    let detail = services.cases.get(case_id)?;
    let next: Vec<&str> = detail
        .next_statuses
        .iter()
        .map(|status| status.label())
        .collect();
    println!(
        "\nFinal status '{}'; next: {}",
        detail.status_label,
        next.join(", ")
    );

    Ok(())
}

pub(crate) fn print_template_catalog(args: TemplateImportArgs) -> Result<(), AppError> {
    let drafts = TemplateCatalogImporter::from_path(&args.path)?;
    println!(
        "Template catalog {} ({} entries)",
        args.path.display(),
        drafts.len()
    );
    for draft in &drafts {
        println!("- {}", describe_template(draft));
    }
    Ok(())
}

pub(crate) fn print_standard_catalog() {
    let blueprint = ChecklistBlueprint::standard();
    println!("Standard template catalog");
    for status in CaseStatus::ordered() {
        let templates = blueprint.templates_for_status(status);
        if templates.is_empty() {
            continue;
        }
        println!("\n{}", status.label());
        for template in templates {
            println!("- {}", describe_template(template));
        }
    }

    let manual: Vec<&TemplateDraft> = blueprint
        .templates()
        .iter()
        .filter(|template| template.trigger_status.is_none())
        .collect();
    if !manual.is_empty() {
        println!("\nManual (added on regeneration)");
        for template in manual {
            println!("- {}", describe_template(template));
        }
    }
}

pub(crate) fn print_workflow_graph() {
    let graph = StatusGraph::standard();
    println!("Case file workflow (initial '{}')", graph.initial().label());
    for node in graph.describe() {
        let next: Vec<&str> = node.next.iter().map(|status| status.as_str()).collect();
        let flags = match (node.editable, node.terminal) {
            (true, _) => " [editable]",
            (false, true) => " [terminal]",
            (false, false) => "",
        };
        if next.is_empty() {
            println!("- {}{}", node.status.as_str(), flags);
        } else {
            println!("- {} -> {}{}", node.status.as_str(), next.join(" | "), flags);
        }
    }
}

fn advance(services: &DemoServices, case_id: CaseFileId, status: CaseStatus) -> Result<(), AppError> {
    let report = services.engine.process_status_change(case_id, status)?;
    println!(
        "\n{} -> {}: {}",
        report.previous_status.as_str(),
        report.new_status.as_str(),
        report.message()
    );
    render_created(&report.created_requirements);
    Ok(())
}

fn complete_pending(services: &DemoServices, case_id: CaseFileId) -> Result<(), AppError> {
    let pending = services
        .engine
        .list_requirements(case_id, RequirementScope::Pending)?;
    for requirement in &pending {
        services.engine.complete_requirement(requirement.id)?;
    }
    println!("Completed {} pending requirement(s)", pending.len());
    Ok(())
}

fn render_created(created: &[CreatedRequirementView]) {
    for requirement in created {
        let due = requirement
            .due_date
            .map(|date| format!(", due {date}"))
            .unwrap_or_default();
        let mandatory = if requirement.mandatory {
            " (mandatory)"
        } else {
            ""
        };
        println!("  + {}{}{}", requirement.name, mandatory, due);
    }
}

fn render_summary(summary: &ChecklistSummary) {
    println!(
        "\nChecklist: {}/{} complete ({:.1}%), {} mandatory pending, {} overdue, ready for documents: {}",
        summary.completed,
        summary.total,
        summary.completion_percentage,
        summary.mandatory_pending,
        summary.overdue,
        if summary.ready_for_documents { "yes" } else { "no" }
    );
    for entry in &summary.by_entity {
        println!(
            "- {}: {}/{} complete",
            entry.label, entry.completed, entry.total
        );
    }
}

fn describe_template(template: &TemplateDraft) -> String {
    let scope = template
        .case_type
        .map(|case_type| case_type.as_str())
        .unwrap_or("all types");
    let trigger = template
        .trigger_status
        .map(|status| status.as_str())
        .unwrap_or("manual");
    let days = template
        .days_to_expire
        .map(|days| format!(", {days} day(s)"))
        .unwrap_or_default();
    let mandatory = if template.mandatory { ", mandatory" } else { "" };
    format!(
        "{} [{} | {}{}{}]",
        template.name, trigger, scope, days, mandatory
    )
}
