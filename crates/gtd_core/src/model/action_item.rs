//! Action item: a single next physical step.
//!
//! # Invariants
//! - `description` is never blank.
//! - `completed_at` is set exactly when `is_completed` is true.
//! - An item with neither project nor context sits in the inbox.

use super::item::{
    require_text, validate_completion, ItemId, ItemKind, Lifecycle, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub uuid: ItemId,
    pub description: String,
    pub notes: String,
    pub project_uuid: Option<ItemId>,
    pub context_uuid: Option<ItemId>,
    /// Unix epoch milliseconds.
    pub due_at: Option<i64>,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl ActionItem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            description: description.into(),
            notes: String::new(),
            project_uuid: None,
            context_uuid: None,
            due_at: None,
            is_completed: false,
            completed_at: None,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn with_project(mut self, project_uuid: ItemId) -> Self {
        self.project_uuid = Some(project_uuid);
        self
    }

    pub fn with_context(mut self, context_uuid: ItemId) -> Self {
        self.context_uuid = Some(context_uuid);
        self
    }

    pub fn complete(&mut self, at: i64) {
        self.is_completed = true;
        self.completed_at = Some(at);
    }

    pub fn reopen(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
    }

    /// Unfiled: no project and no context.
    pub fn is_in_inbox(&self) -> bool {
        self.project_uuid.is_none() && self.context_uuid.is_none()
    }

    pub fn is_active(&self) -> bool {
        !self.lifecycle.is_deleted
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.description, ItemKind::ActionItem, "description")?;
        validate_completion(self.uuid, self.is_completed, self.completed_at)?;
        if self.project_uuid == Some(self.uuid) || self.context_uuid == Some(self.uuid) {
            return Err(ValidationError::InvalidReference {
                id: self.uuid,
                message: "action item cannot reference itself",
            });
        }
        self.lifecycle.validate(self.uuid)
    }
}
