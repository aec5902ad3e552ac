//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Normalize user input (names, tags) and check that referenced parents
//!   are usable before writing.
//! - Keep the CLI and view layer decoupled from storage details.

use crate::model::item::{ItemRef, ValidationError};
use crate::model::label::LabelKind;
use crate::repo::{ParentState, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod action_service;
pub mod archive_service;
pub mod label_service;
pub mod outline_service;
pub mod project_service;
pub mod reference_service;
pub mod trash_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error shared by every use-case facade.
#[derive(Debug)]
pub enum ServiceError {
    /// Model invariant rejected the input.
    Validation(ValidationError),
    /// Tag input contains empty values.
    InvalidTag(String),
    /// Target entity does not exist (or is trashed where that matters).
    NotFound(ItemRef),
    /// An active label with the same name already exists.
    DuplicateName { kind: LabelKind, name: String },
    /// A referenced parent exists but is trashed or completed.
    InactiveReference(ItemRef),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Write succeeded but the read-back disagrees.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::NotFound(item) => write!(f, "not found: {item}"),
            Self::DuplicateName { kind, name } => {
                write!(f, "{} named `{name}` already exists", kind.item_kind())
            }
            Self::InactiveReference(item) => {
                write!(f, "{item} is trashed or completed and cannot take new items")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(item) => Self::NotFound(item),
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::DuplicateName { kind, name } => Self::DuplicateName { kind, name },
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Maps a parent lookup to the error a write should fail with.
///
/// `allow_completed` lets edits keep pointing at a completed parent.
pub(crate) fn require_usable_parent(
    parent: ItemRef,
    state: ParentState,
    allow_completed: bool,
) -> ServiceResult<()> {
    match state {
        ParentState::Missing => Err(ServiceError::NotFound(parent)),
        ParentState::Trashed => Err(ServiceError::InactiveReference(parent)),
        ParentState::Active { completed: true } if !allow_completed => {
            Err(ServiceError::InactiveReference(parent))
        }
        ParentState::Active { .. } => Ok(()),
    }
}

/// Trims a user-entered name. Blank names are left for model validation.
pub(crate) fn clean_name(value: &str) -> String {
    value.trim().to_string()
}
