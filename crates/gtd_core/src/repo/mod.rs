//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity family.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must call `validate()` before persistence.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateName`)
//!   in addition to DB transport errors.

use crate::db::{ensure_schema_ready, DbError};
use crate::model::item::{ItemId, ItemKind, ItemRef, Lifecycle, ValidationError};
use crate::model::label::LabelKind;
use rusqlite::{Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod action_repo;
pub mod archive_repo;
pub mod label_repo;
pub mod project_repo;
pub mod reference_repo;
pub mod trash_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(ItemRef),
    /// An active label with the same name already exists.
    DuplicateName {
        kind: LabelKind,
        name: String,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(item) => write!(f, "item not found: {item}"),
            Self::DuplicateName { kind, name } => {
                write!(f, "{} named `{name}` already exists", kind.item_kind())
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::DuplicateName { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Liveness of an entity another entity wants to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentState {
    Missing,
    Trashed,
    Active { completed: bool },
}

impl ParentState {
    /// Active and not completed.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Active { completed: false })
    }
}

pub(crate) fn load_parent_state(conn: &Connection, item: ItemRef) -> RepoResult<ParentState> {
    let completion = match item.kind {
        ItemKind::Project | ItemKind::ActionItem => "is_completed",
        ItemKind::Context | ItemKind::Category | ItemKind::ReferenceItem => "0",
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT is_deleted, {completion} AS completed FROM {} WHERE uuid = ?1;",
        item.kind.table()
    ))?;
    let mut rows = stmt.query([item.id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(ParentState::Missing);
    };
    let table = item.kind.table();
    if parse_flag(row.get("is_deleted")?, table)? {
        return Ok(ParentState::Trashed);
    }
    Ok(ParentState::Active {
        completed: parse_flag(row.get("completed")?, table)?,
    })
}

/// Whether a row exists for `item`, trashed or not.
pub(crate) fn row_exists(conn: &Connection, item: ItemRef) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE uuid = ?1);",
            item.kind.table()
        ),
        [item.id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Maps a zero-row lifecycle update: an existing row was already in the
/// target state, a missing one is `NotFound`.
pub(crate) fn require_row_if_unchanged(
    conn: &Connection,
    changed: usize,
    item: ItemRef,
) -> RepoResult<()> {
    if changed == 0 && !row_exists(conn, item)? {
        return Err(RepoError::NotFound(item));
    }
    Ok(())
}

pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    ensure_schema_ready(conn)?;
    Ok(())
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<ItemId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<ItemId>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn uuid_to_db(value: Option<ItemId>) -> Option<String> {
    value.map(|id| id.to_string())
}

/// Reads the shared lifecycle columns (`is_deleted`, `deleted_at`,
/// `created_at`, `updated_at`) from one row.
pub(crate) fn parse_lifecycle(row: &Row<'_>, table: &'static str) -> RepoResult<Lifecycle> {
    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in {table}.is_deleted"
            )));
        }
    };

    Ok(Lifecycle {
        is_deleted,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
