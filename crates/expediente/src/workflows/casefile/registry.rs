use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use tracing::info;

use super::blueprint::ChecklistBlueprint;
use super::checklist::{ChecklistError, Missing};
use super::clock::Clock;
use super::domain::TemplateId;
use super::import::{CatalogImportError, TemplateCatalogImporter};
use super::repository::{ChecklistStore, TemplateRepository};
use super::requirements::{RequirementTemplate, TemplateDraft, MAX_DAYS_TO_EXPIRE};

/// Administrative access to the requirement template catalog.
///
/// Template edits never touch requirements that were already generated; cases only catch up
/// through `ChecklistEngine::regenerate_requirements`.
pub struct TemplateRegistry<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> TemplateRegistry<S>
where
    S: ChecklistStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn create(&self, draft: TemplateDraft) -> Result<RequirementTemplate, ChecklistError> {
        let draft = validated(draft)?;
        let template = self.store.insert_template(draft)?;
        info!(template_id = template.id.0, name = %template.name, "requirement template created");
        Ok(template)
    }

    pub fn update(
        &self,
        id: TemplateId,
        draft: TemplateDraft,
    ) -> Result<RequirementTemplate, ChecklistError> {
        let draft = validated(draft)?;
        self.store.atomically(|tx| {
            let mut template = tx
                .find_template(id)?
                .ok_or(ChecklistError::NotFound(Missing::Template(id)))?;
            template.apply(draft);
            tx.update_template(&template)?;
            Ok(template)
        })
    }

    /// Soft delete. Requirements generated from the template keep their advisory link.
    pub fn delete(&self, id: TemplateId) -> Result<(), ChecklistError> {
        let now = self.clock.now();
        self.store.atomically(|tx| {
            tx.find_template(id)?
                .ok_or(ChecklistError::NotFound(Missing::Template(id)))?;
            tx.soft_delete_template(id, now)?;
            Ok::<_, ChecklistError>(())
        })?;
        info!(template_id = id.0, "requirement template deleted");
        Ok(())
    }

    pub fn get(&self, id: TemplateId) -> Result<RequirementTemplate, ChecklistError> {
        self.store
            .find_template(id)?
            .ok_or(ChecklistError::NotFound(Missing::Template(id)))
    }

    pub fn list(&self) -> Result<Vec<RequirementTemplate>, ChecklistError> {
        Ok(self.store.list_templates()?)
    }

    /// Inserts every draft or none of them.
    pub fn create_many(
        &self,
        drafts: Vec<TemplateDraft>,
    ) -> Result<Vec<RequirementTemplate>, ChecklistError> {
        let drafts = drafts
            .into_iter()
            .map(validated)
            .collect::<Result<Vec<_>, _>>()?;

        self.store.atomically(|tx| {
            drafts
                .into_iter()
                .map(|draft| tx.insert_template(draft).map_err(ChecklistError::from))
                .collect()
        })
    }

    /// Adds the standard catalog, skipping entries whose name is already present.
    pub fn seed_standard(&self) -> Result<Vec<RequirementTemplate>, ChecklistError> {
        self.add_missing(ChecklistBlueprint::standard().into_drafts())
    }

    /// Reads a CSV catalog and adds its rows, skipping names already present.
    pub fn import_csv<R: Read>(
        &self,
        reader: R,
    ) -> Result<Vec<RequirementTemplate>, TemplateImportError> {
        let drafts = TemplateCatalogImporter::from_reader(reader)?;
        Ok(self.add_missing(drafts)?)
    }

    /// Inserts the drafts whose name is not in the catalog yet. Repeated names within the batch
    /// are added once.
    pub fn add_missing(
        &self,
        drafts: Vec<TemplateDraft>,
    ) -> Result<Vec<RequirementTemplate>, ChecklistError> {
        let mut known: HashSet<String> = self
            .store
            .list_templates()?
            .into_iter()
            .map(|template| template.name)
            .collect();

        let fresh: Vec<TemplateDraft> = drafts
            .into_iter()
            .filter(|draft| known.insert(draft.name.trim().to_string()))
            .collect();
        let created = self.create_many(fresh)?;
        info!(created = created.len(), "requirement template catalog extended");
        Ok(created)
    }
}

/// Failure while importing a template catalog into the registry.
#[derive(Debug, thiserror::Error)]
pub enum TemplateImportError {
    #[error(transparent)]
    Catalog(#[from] CatalogImportError),
    #[error(transparent)]
    Checklist(#[from] ChecklistError),
}

fn validated(mut draft: TemplateDraft) -> Result<TemplateDraft, ChecklistError> {
    draft.name = draft.name.trim().to_string();
    if draft.name.is_empty() {
        return Err(ChecklistError::Invalid(
            "template name must not be blank".to_string(),
        ));
    }
    if let Some(days) = draft.days_to_expire.filter(|days| *days > MAX_DAYS_TO_EXPIRE) {
        return Err(ChecklistError::Invalid(format!(
            "days_to_expire {days} exceeds the {MAX_DAYS_TO_EXPIRE} day limit"
        )));
    }
    Ok(draft)
}
