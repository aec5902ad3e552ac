//! Project use-case service.
//!
//! # Invariants
//! - A project can only be filed under an active category.
//! - Trash/restore and complete/reopen cascade to the project's action
//!   items through the repository, in one transaction each.

use crate::model::item::{now_epoch_ms, ItemId, ItemKind, ItemRef};
use crate::model::project::Project;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::service::{clean_name, require_usable_parent, ServiceError, ServiceResult};
use log::info;

/// Input for [`ProjectService::add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub category_uuid: Option<ItemId>,
    pub due_at: Option<i64>,
}

impl NewProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update. Outer `None` leaves a field untouched; `Some(None)`
/// clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_uuid: Option<Option<ItemId>>,
    pub due_at: Option<Option<i64>>,
}

/// Outcome of a cascading project operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCascade {
    pub project: Project,
    /// Action items changed together with the project.
    pub action_items: usize,
}

pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add(&self, input: NewProject) -> ServiceResult<Project> {
        let mut project = Project::new(clean_name(&input.name));
        project.description = input.description;
        project.due_at = input.due_at;
        project.category_uuid = input.category_uuid;
        project.validate()?;
        self.check_category(project.category_uuid)?;

        let id = self.repo.create_project(&project)?;
        info!("event=project_add module=service status=ok id={id}");
        self.read_back(id, false, "created project not found in read-back")
    }

    pub fn edit(&self, id: ItemId, patch: ProjectPatch) -> ServiceResult<Project> {
        let mut project = self.require_active(id)?;
        if let Some(name) = patch.name {
            project.name = clean_name(&name);
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(due_at) = patch.due_at {
            project.due_at = due_at;
        }
        if let Some(category_uuid) = patch.category_uuid {
            if category_uuid != project.category_uuid {
                self.check_category(category_uuid)?;
            }
            project.category_uuid = category_uuid;
        }
        self.repo.update_project(&project)?;
        self.read_back(id, false, "edited project not found in read-back")
    }

    pub fn get(&self, id: ItemId) -> ServiceResult<Option<Project>> {
        Ok(self.repo.get_project(id, false)?)
    }

    /// Case-insensitive name lookup among non-trashed projects, open ones
    /// first.
    pub fn find(&self, name: &str) -> ServiceResult<Option<Project>> {
        let wanted = name.trim().to_lowercase();
        let mut matches: Vec<Project> = self
            .list(&ProjectListQuery::default())?
            .into_iter()
            .filter(|project| project.name.to_lowercase() == wanted)
            .collect();
        matches.sort_by_key(|project| project.is_completed);
        Ok(matches.into_iter().next())
    }

    pub fn list(&self, query: &ProjectListQuery) -> ServiceResult<Vec<Project>> {
        Ok(self.repo.list_projects(query)?)
    }

    /// Open, non-trashed projects.
    pub fn list_open(&self) -> ServiceResult<Vec<Project>> {
        self.list(&ProjectListQuery {
            completed: Some(false),
            ..ProjectListQuery::default()
        })
    }

    pub fn complete(&self, id: ItemId) -> ServiceResult<ProjectCascade> {
        let action_items = self.repo.complete_project(id, now_epoch_ms())?;
        info!(
            "event=project_complete module=service status=ok id={id} cascaded={action_items}"
        );
        Ok(ProjectCascade {
            project: self.read_back(id, false, "completed project not found in read-back")?,
            action_items,
        })
    }

    pub fn reopen(&self, id: ItemId) -> ServiceResult<ProjectCascade> {
        let action_items = self.repo.reopen_project(id)?;
        Ok(ProjectCascade {
            project: self.read_back(id, false, "reopened project not found in read-back")?,
            action_items,
        })
    }

    pub fn trash(&self, id: ItemId) -> ServiceResult<ProjectCascade> {
        let action_items = self.repo.soft_delete_project(id, now_epoch_ms())?;
        info!("event=project_trash module=service status=ok id={id} cascaded={action_items}");
        Ok(ProjectCascade {
            project: self.read_back(id, true, "trashed project not found in read-back")?,
            action_items,
        })
    }

    pub fn restore(&self, id: ItemId) -> ServiceResult<ProjectCascade> {
        let action_items = self.repo.restore_project(id)?;
        Ok(ProjectCascade {
            project: self.read_back(id, false, "restored project not found in read-back")?,
            action_items,
        })
    }

    fn check_category(&self, category_uuid: Option<ItemId>) -> ServiceResult<()> {
        let Some(category_uuid) = category_uuid else {
            return Ok(());
        };
        let parent = ItemRef::new(ItemKind::Category, category_uuid);
        require_usable_parent(parent, self.repo.parent_state(parent)?, false)
    }

    fn require_active(&self, id: ItemId) -> ServiceResult<Project> {
        self.repo
            .get_project(id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::new(ItemKind::Project, id)))
    }

    fn read_back(
        &self,
        id: ItemId,
        include_deleted: bool,
        details: &'static str,
    ) -> ServiceResult<Project> {
        self.repo
            .get_project(id, include_deleted)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
