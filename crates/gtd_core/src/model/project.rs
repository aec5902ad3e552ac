//! GTD project: a multi-step outcome that owns action items.

use super::item::{
    require_text, validate_completion, ItemId, ItemKind, Lifecycle, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub uuid: ItemId,
    pub name: String,
    pub description: String,
    pub category_uuid: Option<ItemId>,
    /// Unix epoch milliseconds.
    pub due_at: Option<i64>,
    /// Completed projects show up in the archive.
    pub is_completed: bool,
    pub completed_at: Option<i64>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            category_uuid: None,
            due_at: None,
            is_completed: false,
            completed_at: None,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn complete(&mut self, at: i64) {
        self.is_completed = true;
        self.completed_at = Some(at);
    }

    pub fn reopen(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
    }

    pub fn is_active(&self) -> bool {
        !self.lifecycle.is_deleted
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, ItemKind::Project, "name")?;
        validate_completion(self.uuid, self.is_completed, self.completed_at)?;
        self.lifecycle.validate(self.uuid)
    }
}
