//! Archive repository: completed projects and action items.

use crate::model::item::{ItemId, ItemKind, ItemRef};
use crate::repo::{
    ensure_connection_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// One completed entity, as shown in the archive view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub item: ItemRef,
    pub title: String,
    pub completed_at: i64,
    /// Owning project for archived action items.
    pub project_uuid: Option<ItemId>,
}

/// Repository interface for the archive view.
pub trait ArchiveRepository {
    /// Lists completed, non-deleted projects and action items, most recently
    /// completed first.
    fn list_archive(&self, limit: Option<u32>) -> RepoResult<Vec<ArchiveEntry>>;
}

/// SQLite-backed archive repository.
pub struct SqliteArchiveRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArchiveRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ArchiveRepository for SqliteArchiveRepository<'_> {
    fn list_archive(&self, limit: Option<u32>) -> RepoResult<Vec<ArchiveEntry>> {
        let mut sql = String::from(
            "SELECT 'project' AS kind, uuid, name AS title, completed_at, NULL AS project_uuid
             FROM projects
             WHERE is_completed = 1 AND is_deleted = 0
             UNION ALL
             SELECT 'action_item' AS kind, uuid, description AS title, completed_at, project_uuid
             FROM action_items
             WHERE is_completed = 1 AND is_deleted = 0
             ORDER BY completed_at DESC, uuid ASC",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let kind_text: String = row.get("kind")?;
            let kind = ItemKind::parse(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid archive kind `{kind_text}`"))
            })?;
            let uuid_text: String = row.get("uuid")?;
            let completed_at: Option<i64> = row.get("completed_at")?;
            entries.push(ArchiveEntry {
                item: ItemRef::new(kind, parse_uuid(&uuid_text, "archive.uuid")?),
                title: row.get("title")?,
                completed_at: completed_at.ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "completed {kind} `{uuid_text}` has no completed_at"
                    ))
                })?,
                project_uuid: parse_optional_uuid(row.get("project_uuid")?, "archive.project_uuid")?,
            });
        }
        Ok(entries)
    }
}
