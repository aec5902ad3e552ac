//! Contexts and categories.
//!
//! Both are named labels with the same shape: a context says where or how an
//! action item can be done (`@phone`, `@errands`), a category groups
//! projects and reference items.

use super::item::{require_text, ItemId, ItemKind, Lifecycle, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which label table a [`Label`] lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Context,
    Category,
}

impl LabelKind {
    pub fn item_kind(self) -> ItemKind {
        match self {
            Self::Context => ItemKind::Context,
            Self::Category => ItemKind::Category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub uuid: ItemId,
    pub kind: LabelKind,
    /// Unique among active labels of the same kind, case-insensitively.
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Label {
    pub fn new(kind: LabelKind, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            name: name.into(),
            description: String::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn context(name: impl Into<String>) -> Self {
        Self::new(LabelKind::Context, name)
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self::new(LabelKind::Category, name)
    }

    pub fn is_active(&self) -> bool {
        !self.lifecycle.is_deleted
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, self.kind.item_kind(), "name")?;
        self.lifecycle.validate(self.uuid)
    }
}
