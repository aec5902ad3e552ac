//! Action item use-case service.
//!
//! # Responsibility
//! - Capture, edit, file and complete action items.
//! - Provide the GTD list views: inbox, per project, per context and
//!   next actions.
//!
//! # Invariants
//! - New and moved items only point at active projects/contexts; a
//!   completed project takes no new or reopened items.
//! - List views return open, non-trashed items unless stated otherwise.

use crate::model::action_item::ActionItem;
use crate::model::item::{now_epoch_ms, ItemId, ItemKind, ItemRef};
use crate::repo::action_repo::{ActionListQuery, ActionRepository};
use crate::service::{require_usable_parent, ServiceError, ServiceResult};
use log::info;

/// Input for [`ActionService::add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAction {
    pub description: String,
    pub notes: String,
    pub project_uuid: Option<ItemId>,
    pub context_uuid: Option<ItemId>,
    pub due_at: Option<i64>,
}

impl NewAction {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }
}

/// Partial update. Outer `None` leaves a field untouched; `Some(None)`
/// clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPatch {
    pub description: Option<String>,
    pub notes: Option<String>,
    pub project_uuid: Option<Option<ItemId>>,
    pub context_uuid: Option<Option<ItemId>>,
    pub due_at: Option<Option<i64>>,
}

pub struct ActionService<R: ActionRepository> {
    repo: R,
}

impl<R: ActionRepository> ActionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add(&self, input: NewAction) -> ServiceResult<ActionItem> {
        let mut item = ActionItem::new(input.description.trim());
        item.notes = input.notes;
        item.due_at = input.due_at;
        item.project_uuid = input.project_uuid;
        item.context_uuid = input.context_uuid;
        item.validate()?;
        self.check_project(item.project_uuid)?;
        self.check_context(item.context_uuid)?;

        let id = self.repo.create_action(&item)?;
        info!("event=action_add module=service status=ok id={id}");
        self.read_back(id, "created action item not found in read-back")
    }

    pub fn edit(&self, id: ItemId, patch: ActionPatch) -> ServiceResult<ActionItem> {
        let mut item = self.require_active(id)?;
        if let Some(description) = patch.description {
            item.description = description.trim().to_string();
        }
        if let Some(notes) = patch.notes {
            item.notes = notes;
        }
        if let Some(due_at) = patch.due_at {
            item.due_at = due_at;
        }
        if let Some(project_uuid) = patch.project_uuid {
            if project_uuid != item.project_uuid {
                self.check_project(project_uuid)?;
            }
            item.project_uuid = project_uuid;
        }
        if let Some(context_uuid) = patch.context_uuid {
            if context_uuid != item.context_uuid {
                self.check_context(context_uuid)?;
            }
            item.context_uuid = context_uuid;
        }
        self.repo.update_action(&item)?;
        self.read_back(id, "edited action item not found in read-back")
    }

    /// Re-files an item. `None` clears the link; both `None` sends it back
    /// to the inbox.
    pub fn move_to(
        &self,
        id: ItemId,
        project_uuid: Option<ItemId>,
        context_uuid: Option<ItemId>,
    ) -> ServiceResult<ActionItem> {
        self.edit(
            id,
            ActionPatch {
                project_uuid: Some(project_uuid),
                context_uuid: Some(context_uuid),
                ..ActionPatch::default()
            },
        )
    }

    pub fn complete(&self, id: ItemId) -> ServiceResult<ActionItem> {
        let mut item = self.require_active(id)?;
        if item.is_completed {
            return Ok(item);
        }
        item.complete(now_epoch_ms());
        self.repo.update_action(&item)?;
        info!("event=action_complete module=service status=ok id={id}");
        self.read_back(id, "completed action item not found in read-back")
    }

    pub fn reopen(&self, id: ItemId) -> ServiceResult<ActionItem> {
        let mut item = self.require_active(id)?;
        if !item.is_completed {
            return Ok(item);
        }
        self.check_project(item.project_uuid)?;
        item.reopen();
        self.repo.update_action(&item)?;
        self.read_back(id, "reopened action item not found in read-back")
    }

    pub fn get(&self, id: ItemId) -> ServiceResult<Option<ActionItem>> {
        Ok(self.repo.get_action(id, false)?)
    }

    pub fn list(&self, query: &ActionListQuery) -> ServiceResult<Vec<ActionItem>> {
        Ok(self.repo.list_actions(query)?)
    }

    /// Open items with neither project nor context.
    pub fn inbox(&self) -> ServiceResult<Vec<ActionItem>> {
        self.list(&ActionListQuery {
            inbox_only: true,
            completed: Some(false),
            ..ActionListQuery::default()
        })
    }

    pub fn by_project(&self, project_uuid: ItemId) -> ServiceResult<Vec<ActionItem>> {
        self.list(&ActionListQuery {
            project_uuid: Some(project_uuid),
            completed: Some(false),
            ..ActionListQuery::default()
        })
    }

    pub fn by_context(&self, context_uuid: ItemId) -> ServiceResult<Vec<ActionItem>> {
        self.list(&ActionListQuery {
            context_uuid: Some(context_uuid),
            completed: Some(false),
            ..ActionListQuery::default()
        })
    }

    /// Every open item, soonest due first.
    pub fn next_actions(&self, limit: Option<u32>) -> ServiceResult<Vec<ActionItem>> {
        self.list(&ActionListQuery {
            completed: Some(false),
            limit,
            ..ActionListQuery::default()
        })
    }

    pub fn trash(&self, id: ItemId) -> ServiceResult<()> {
        self.repo.soft_delete_action(id, now_epoch_ms())?;
        info!("event=action_trash module=service status=ok id={id}");
        Ok(())
    }

    /// Restores one item. If its project is still trashed the item comes
    /// back without a project.
    pub fn restore(&self, id: ItemId) -> ServiceResult<ActionItem> {
        Ok(self.repo.restore_action(id)?)
    }

    fn check_project(&self, project_uuid: Option<ItemId>) -> ServiceResult<()> {
        let Some(project_uuid) = project_uuid else {
            return Ok(());
        };
        let parent = ItemRef::new(ItemKind::Project, project_uuid);
        require_usable_parent(parent, self.repo.parent_state(parent)?, false)
    }

    fn check_context(&self, context_uuid: Option<ItemId>) -> ServiceResult<()> {
        let Some(context_uuid) = context_uuid else {
            return Ok(());
        };
        let parent = ItemRef::new(ItemKind::Context, context_uuid);
        require_usable_parent(parent, self.repo.parent_state(parent)?, false)
    }

    fn require_active(&self, id: ItemId) -> ServiceResult<ActionItem> {
        self.repo
            .get_action(id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::new(ItemKind::ActionItem, id)))
    }

    fn read_back(&self, id: ItemId, details: &'static str) -> ServiceResult<ActionItem> {
        self.repo
            .get_action(id, false)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
