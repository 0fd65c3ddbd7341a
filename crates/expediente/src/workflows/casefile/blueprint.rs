use super::domain::{CaseStatus, CaseType, TargetEntity};
use super::requirements::TemplateDraft;

/// Standard catalog of sponsorship requirement templates.
#[derive(Debug)]
pub struct ChecklistBlueprint {
    templates: Vec<TemplateDraft>,
}

impl ChecklistBlueprint {
    pub fn standard() -> Self {
        Self {
            templates: standard_templates(),
        }
    }

    pub fn templates_for_status(&self, status: CaseStatus) -> Vec<&TemplateDraft> {
        self.templates
            .iter()
            .filter(|template| template.trigger_status == Some(status))
            .collect()
    }

    pub fn templates(&self) -> &[TemplateDraft] {
        &self.templates
    }

    pub fn into_drafts(self) -> Vec<TemplateDraft> {
        self.templates
    }
}

struct Entry {
    name: &'static str,
    description: &'static str,
    target: TargetEntity,
    case_type: Option<CaseType>,
    trigger: Option<CaseStatus>,
    days: Option<u32>,
    mandatory: bool,
}

impl From<Entry> for TemplateDraft {
    fn from(entry: Entry) -> Self {
        TemplateDraft {
            name: entry.name.to_string(),
            description: Some(entry.description.to_string()),
            target_entity: Some(entry.target),
            case_type: entry.case_type,
            trigger_status: entry.trigger,
            days_to_expire: entry.days,
            mandatory: entry.mandatory,
        }
    }
}

fn standard_templates() -> Vec<TemplateDraft> {
    vec![
        Entry {
            name: "Full passport copy",
            description: "Every page of the worker's passport, valid for at least the length of the contract.",
            target: TargetEntity::Worker,
            case_type: None,
            trigger: Some(CaseStatus::Draft),
            days: Some(15),
            mandatory: true,
        },
        Entry {
            name: "Tax agency compliance certificate",
            description: "AEAT certificate showing the employer is current with tax obligations.",
            target: TargetEntity::Employer,
            case_type: None,
            trigger: Some(CaseStatus::Draft),
            days: Some(20),
            mandatory: true,
        },
        Entry {
            name: "Social Security compliance certificate",
            description: "TGSS certificate showing the employer is current with contributions.",
            target: TargetEntity::Employer,
            case_type: None,
            trigger: Some(CaseStatus::Draft),
            days: Some(20),
            mandatory: true,
        },
        Entry {
            name: "Signed employment contract",
            description: "Contract on the official model signed by both parties, matching the job offer.",
            target: TargetEntity::Employer,
            case_type: Some(CaseType::InitialEmployment),
            trigger: Some(CaseStatus::PendingReview),
            days: Some(10),
            mandatory: true,
        },
        Entry {
            name: "Criminal record certificate",
            description: "Issued by the country of origin within the last six months, legalized or apostilled and translated.",
            target: TargetEntity::Worker,
            case_type: Some(CaseType::InitialEmployment),
            trigger: Some(CaseStatus::PendingReview),
            days: Some(30),
            mandatory: true,
        },
        Entry {
            name: "Seasonal housing commitment",
            description: "Employer statement guaranteeing adequate housing for the whole campaign.",
            target: TargetEntity::Employer,
            case_type: Some(CaseType::Seasonal),
            trigger: Some(CaseStatus::PendingReview),
            days: Some(10),
            mandatory: true,
        },
        Entry {
            name: "Social integration report",
            description: "Report from the regional government or town council supporting the application.",
            target: TargetEntity::Worker,
            case_type: Some(CaseType::SocialRoots),
            trigger: Some(CaseStatus::PendingReview),
            days: Some(45),
            mandatory: true,
        },
        Entry {
            name: "Proof of continued employment",
            description: "Payslips and contribution history covering the current permit period.",
            target: TargetEntity::Worker,
            case_type: Some(CaseType::Renewal),
            trigger: Some(CaseStatus::PendingReview),
            days: Some(15),
            mandatory: true,
        },
        Entry {
            name: "Fee 790-052 payment receipt",
            description: "Bank-stamped receipt for the residence and work authorization fee.",
            target: TargetEntity::Employer,
            case_type: None,
            trigger: Some(CaseStatus::Ready),
            days: Some(5),
            mandatory: true,
        },
        Entry {
            name: "Representation authorization",
            description: "Signed authorization allowing the representative to file on the employer's behalf.",
            target: TargetEntity::Representative,
            case_type: None,
            trigger: Some(CaseStatus::Ready),
            days: Some(5),
            mandatory: true,
        },
        Entry {
            name: "Response to information request",
            description: "Written reply and supporting documents addressing every point raised by the immigration office.",
            target: TargetEntity::Representative,
            case_type: None,
            trigger: Some(CaseStatus::Required),
            days: Some(10),
            mandatory: true,
        },
        Entry {
            name: "Fingerprinting appointment (TIE)",
            description: "Book the appointment to collect the foreigner identity card after entry.",
            target: TargetEntity::Worker,
            case_type: None,
            trigger: Some(CaseStatus::Favorable),
            days: Some(30),
            mandatory: true,
        },
        Entry {
            name: "Social Security registration",
            description: "Register the worker with Social Security within three months of the resolution.",
            target: TargetEntity::Employer,
            case_type: None,
            trigger: Some(CaseStatus::Favorable),
            days: Some(90),
            mandatory: true,
        },
        Entry {
            name: "Additional supporting documents",
            description: "Any extra document the case manager requests for this file.",
            target: TargetEntity::General,
            case_type: None,
            trigger: None,
            days: None,
            mandatory: false,
        },
    ]
    .into_iter()
    .map(TemplateDraft::from)
    .collect()
}
