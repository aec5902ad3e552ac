//! Identity, kind and validation primitives shared by every entity.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for every organizer entity.
pub type ItemId = Uuid;

/// Entity family, used by trash, search and archive views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Context,
    Category,
    Project,
    ActionItem,
    ReferenceItem,
}

impl ItemKind {
    /// All kinds, in trash/empty order (children before parents).
    pub const ALL: [ItemKind; 5] = [
        ItemKind::ActionItem,
        ItemKind::ReferenceItem,
        ItemKind::Project,
        ItemKind::Context,
        ItemKind::Category,
    ];

    /// Storage string used in `search_index.kind` and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Category => "category",
            Self::Project => "project",
            Self::ActionItem => "action_item",
            Self::ReferenceItem => "reference_item",
        }
    }

    /// Parses a storage string back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "context" => Some(Self::Context),
            "category" => Some(Self::Category),
            "project" => Some(Self::Project),
            "action_item" => Some(Self::ActionItem),
            "reference_item" => Some(Self::ReferenceItem),
            _ => None,
        }
    }

    /// Backing table name.
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Context => "contexts",
            Self::Category => "categories",
            Self::Project => "projects",
            Self::ActionItem => "action_items",
            Self::ReferenceItem => "reference_items",
        }
    }

    /// Column holding the user-facing title.
    pub(crate) fn title_column(self) -> &'static str {
        match self {
            Self::Context | Self::Category | Self::Project => "name",
            Self::ActionItem => "description",
            Self::ReferenceItem => "title",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Typed reference to one entity of a known kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: ItemId,
}

impl ItemRef {
    pub fn new(kind: ItemKind, id: ItemId) -> Self {
        Self { kind, id }
    }
}

impl Display for ItemRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Model invariant violation detected before a write or after a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField {
        kind: ItemKind,
        field: &'static str,
    },
    /// `completed_at` presence disagrees with `is_completed`.
    CompletionMismatch(ItemId),
    /// `deleted_at` presence disagrees with `is_deleted`.
    DeletionMismatch(ItemId),
    /// An entity references itself or an impossible parent.
    InvalidReference {
        id: ItemId,
        message: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { kind, field } => write!(f, "{kind} {field} must not be blank"),
            Self::CompletionMismatch(id) => {
                write!(f, "completion timestamp disagrees with completion flag: {id}")
            }
            Self::DeletionMismatch(id) => {
                write!(f, "deletion timestamp disagrees with deletion flag: {id}")
            }
            Self::InvalidReference { id, message } => write!(f, "invalid reference on {id}: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Soft-delete and timestamp fields carried by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Soft delete tombstone; the row stays until the trash is emptied.
    pub is_deleted: bool,
    /// Epoch ms of the soft delete. Shared by every row of one cascade.
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Lifecycle {
    /// Fresh, active lifecycle stamped with the current time.
    pub fn new() -> Self {
        let now = now_epoch_ms();
        Self {
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn soft_delete(&mut self, at: i64) {
        self.is_deleted = true;
        self.deleted_at = Some(at);
    }

    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.deleted_at = None;
    }

    pub(crate) fn validate(&self, id: ItemId) -> Result<(), ValidationError> {
        if self.is_deleted != self.deleted_at.is_some() {
            return Err(ValidationError::DeletionMismatch(id));
        }
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall clock in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

pub(crate) fn require_text(
    value: &str,
    kind: ItemKind,
    field: &'static str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField { kind, field });
    }
    Ok(())
}

pub(crate) fn validate_completion(
    id: ItemId,
    is_completed: bool,
    completed_at: Option<i64>,
) -> Result<(), ValidationError> {
    if is_completed != completed_at.is_some() {
        return Err(ValidationError::CompletionMismatch(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ItemKind, Lifecycle};
    use uuid::Uuid;

    #[test]
    fn kind_strings_roundtrip() {
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ItemKind::parse("note"), None);
    }

    #[test]
    fn lifecycle_rejects_half_deleted_state() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.is_deleted = true;
        assert!(lifecycle.validate(Uuid::new_v4()).is_err());

        lifecycle.deleted_at = Some(10);
        assert!(lifecycle.validate(Uuid::new_v4()).is_ok());

        lifecycle.restore();
        assert!(!lifecycle.is_deleted);
        assert_eq!(lifecycle.deleted_at, None);
    }
}
