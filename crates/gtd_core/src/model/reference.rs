//! Reference material: filed information that needs no action.

use super::item::{require_text, ItemId, ItemKind, Lifecycle, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub uuid: ItemId,
    pub title: String,
    /// Markdown or plain text.
    pub body: String,
    pub url: Option<String>,
    /// Derived from `body`; recomputed by the reference service on write.
    pub preview_text: Option<String>,
    pub category_uuid: Option<ItemId>,
    /// Lowercase, deduplicated, sorted.
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl ReferenceItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            body: String::new(),
            url: None,
            preview_text: None,
            category_uuid: None,
            tags: Vec::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.lifecycle.is_deleted
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.title, ItemKind::ReferenceItem, "title")?;
        if let Some(url) = self.url.as_deref() {
            require_text(url, ItemKind::ReferenceItem, "url")?;
        }
        self.lifecycle.validate(self.uuid)
    }
}
