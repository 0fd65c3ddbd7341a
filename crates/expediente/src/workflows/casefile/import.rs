//! CSV import of requirement template catalogs.
//!
//! Expected header: `name,description,target_entity,case_type,trigger_status,days_to_expire,mandatory`.
//! Empty cells mean "not set"; an empty `case_type` applies to every case type and an empty
//! `trigger_status` marks a manual template.

use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use super::domain::{CaseStatus, CaseType, TargetEntity};
use super::requirements::{TemplateDraft, MAX_DAYS_TO_EXPIRE};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { row: usize, reason: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read template catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid template catalog CSV: {}", err),
            CatalogImportError::InvalidRow { row, reason } => {
                write!(f, "template catalog row {}: {}", row, reason)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct TemplateCatalogImporter;

impl TemplateCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<TemplateDraft>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<TemplateDraft>, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut drafts = Vec::new();

        for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            // Header is line 1.
            let row = index + 2;
            let draft = record?
                .into_draft()
                .map_err(|reason| CatalogImportError::InvalidRow { row, reason })?;
            drafts.push(draft);
        }

        Ok(drafts)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    target_entity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    case_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    trigger_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    days_to_expire: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    mandatory: Option<String>,
}

impl CatalogRow {
    fn into_draft(self) -> Result<TemplateDraft, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("name must not be blank".to_string());
        }

        Ok(TemplateDraft {
            name,
            description: self.description,
            target_entity: parse_optional::<TargetEntity>(self.target_entity.as_deref())?,
            case_type: parse_optional::<CaseType>(self.case_type.as_deref())?,
            trigger_status: parse_optional::<CaseStatus>(self.trigger_status.as_deref())?,
            days_to_expire: self
                .days_to_expire
                .as_deref()
                .map(parse_days)
                .transpose()?,
            mandatory: self
                .mandatory
                .as_deref()
                .map(parse_flag)
                .transpose()?
                .unwrap_or(false),
        })
    }
}

fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| value.parse::<T>().map_err(|err| err.to_string()))
        .transpose()
}

fn parse_days(raw: &str) -> Result<u32, String> {
    let days = raw
        .parse::<u32>()
        .map_err(|_| format!("days_to_expire '{raw}' is not a whole number of days"))?;
    if days > MAX_DAYS_TO_EXPIRE {
        return Err(format!(
            "days_to_expire {days} exceeds the {MAX_DAYS_TO_EXPIRE} day limit"
        ));
    }
    Ok(days)
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "y" => Ok(true),
        "false" | "no" | "0" | "n" => Ok(false),
        other => Err(format!("mandatory '{other}' is not a boolean")),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CATALOG: &str = "\
name,description,target_entity,case_type,trigger_status,days_to_expire,mandatory
Passport copy,All pages,worker,,draft,15,true
Housing commitment,,employer,seasonal,pending_review,10,yes
Extra documents,,,,,,
";

    #[test]
    fn parses_rows_with_empty_cells_as_unset() {
        let drafts =
            TemplateCatalogImporter::from_reader(Cursor::new(CATALOG)).expect("catalog parses");
        assert_eq!(drafts.len(), 3);

        assert_eq!(drafts[0].name, "Passport copy");
        assert_eq!(drafts[0].description.as_deref(), Some("All pages"));
        assert_eq!(drafts[0].target_entity, Some(TargetEntity::Worker));
        assert_eq!(drafts[0].case_type, None);
        assert_eq!(drafts[0].trigger_status, Some(CaseStatus::Draft));
        assert_eq!(drafts[0].days_to_expire, Some(15));
        assert!(drafts[0].mandatory);

        assert_eq!(drafts[1].case_type, Some(CaseType::Seasonal));
        assert_eq!(drafts[1].trigger_status, Some(CaseStatus::PendingReview));
        assert!(drafts[1].description.is_none());

        assert!(drafts[2].trigger_status.is_none());
        assert!(drafts[2].days_to_expire.is_none());
        assert!(!drafts[2].mandatory);
    }

    #[test]
    fn reports_row_number_for_unknown_status() {
        let csv = "\
name,description,target_entity,case_type,trigger_status,days_to_expire,mandatory
Passport copy,,worker,,draft,15,true
Broken,,worker,,shipped,5,false
";
        let err = TemplateCatalogImporter::from_reader(Cursor::new(csv)).expect_err("bad status");
        match err {
            CatalogImportError::InvalidRow { row, reason } => {
                assert_eq!(row, 3);
                assert!(reason.contains("shipped"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_negative_days() {
        let csv = "\
name,description,target_entity,case_type,trigger_status,days_to_expire,mandatory
Passport copy,,worker,,draft,-3,true
";
        let err = TemplateCatalogImporter::from_reader(Cursor::new(csv)).expect_err("bad days");
        assert!(err.to_string().contains("days_to_expire"));
    }

    #[test]
    fn rejects_days_beyond_the_limit() {
        let csv = "\
name,description,target_entity,case_type,trigger_status,days_to_expire,mandatory
Passport copy,,worker,,draft,36500,true
Visa stamp,,worker,,ready,4294967295,true
";
        let err = TemplateCatalogImporter::from_reader(Cursor::new(csv)).expect_err("too far out");
        match err {
            CatalogImportError::InvalidRow { row, reason } => {
                assert_eq!(row, 3);
                assert!(reason.contains("4294967295"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = TemplateCatalogImporter::from_path("/nonexistent/catalog.csv")
            .expect_err("missing file");
        assert!(matches!(err, CatalogImportError::Io(_)));
    }
}
