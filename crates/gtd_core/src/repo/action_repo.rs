//! Action item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over `action_items` with the list filters GTD views need.
//!
//! # Invariants
//! - Listing order is deterministic: dated items first by due date, then
//!   creation order, then `uuid`.
//! - Restoring an item whose project is still trashed (or gone) files the
//!   item back without a project.

use crate::model::action_item::ActionItem;
use crate::model::item::{now_epoch_ms, ItemId, ItemKind, ItemRef};
use crate::repo::{
    bool_to_int, ensure_connection_ready, load_parent_state, parse_flag, parse_lifecycle,
    parse_optional_uuid, parse_uuid, require_row_if_unchanged, uuid_to_db, ParentState, RepoError,
    RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const ACTION_SELECT_SQL: &str = "SELECT
    uuid,
    description,
    notes,
    project_uuid,
    context_uuid,
    due_at,
    is_completed,
    completed_at,
    is_deleted,
    deleted_at,
    created_at,
    updated_at
FROM action_items";

/// Query options for listing action items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionListQuery {
    pub project_uuid: Option<ItemId>,
    pub context_uuid: Option<ItemId>,
    /// Only items with neither project nor context.
    pub inbox_only: bool,
    /// `Some(false)` = open items, `Some(true)` = done items.
    pub completed: Option<bool>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for action items.
pub trait ActionRepository {
    fn create_action(&self, item: &ActionItem) -> RepoResult<ItemId>;
    fn update_action(&self, item: &ActionItem) -> RepoResult<()>;
    fn get_action(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<ActionItem>>;
    fn list_actions(&self, query: &ActionListQuery) -> RepoResult<Vec<ActionItem>>;
    fn soft_delete_action(&self, id: ItemId, at: i64) -> RepoResult<()>;
    /// Restores one trashed item and returns its restored state.
    fn restore_action(&self, id: ItemId) -> RepoResult<ActionItem>;
    /// State of a project or context an item is about to be filed under.
    fn parent_state(&self, parent: ItemRef) -> RepoResult<ParentState>;
}

/// SQLite-backed action item repository.
pub struct SqliteActionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ActionRepository for SqliteActionRepository<'_> {
    fn parent_state(&self, parent: ItemRef) -> RepoResult<ParentState> {
        load_parent_state(self.conn, parent)
    }

    fn create_action(&self, item: &ActionItem) -> RepoResult<ItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO action_items (
                uuid,
                description,
                notes,
                project_uuid,
                context_uuid,
                due_at,
                is_completed,
                completed_at,
                is_deleted,
                deleted_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                item.uuid.to_string(),
                item.description.as_str(),
                item.notes.as_str(),
                uuid_to_db(item.project_uuid),
                uuid_to_db(item.context_uuid),
                item.due_at,
                bool_to_int(item.is_completed),
                item.completed_at,
                bool_to_int(item.lifecycle.is_deleted),
                item.lifecycle.deleted_at,
                item.lifecycle.created_at,
                item.lifecycle.updated_at,
            ],
        )?;

        Ok(item.uuid)
    }

    fn update_action(&self, item: &ActionItem) -> RepoResult<()> {
        item.validate()?;

        let changed = self.conn.execute(
            "UPDATE action_items
             SET
                description = ?1,
                notes = ?2,
                project_uuid = ?3,
                context_uuid = ?4,
                due_at = ?5,
                is_completed = ?6,
                completed_at = ?7,
                is_deleted = ?8,
                deleted_at = ?9,
                updated_at = ?10
             WHERE uuid = ?11;",
            params![
                item.description.as_str(),
                item.notes.as_str(),
                uuid_to_db(item.project_uuid),
                uuid_to_db(item.context_uuid),
                item.due_at,
                bool_to_int(item.is_completed),
                item.completed_at,
                bool_to_int(item.lifecycle.is_deleted),
                item.lifecycle.deleted_at,
                now_epoch_ms(),
                item.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(ItemRef::new(
                ItemKind::ActionItem,
                item.uuid,
            )));
        }
        Ok(())
    }

    fn get_action(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<ActionItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACTION_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_action_row(row)?));
        }
        Ok(None)
    }

    fn list_actions(&self, query: &ActionListQuery) -> RepoResult<Vec<ActionItem>> {
        let mut sql = format!("{ACTION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }
        if query.inbox_only {
            sql.push_str(" AND project_uuid IS NULL AND context_uuid IS NULL");
        }
        if let Some(project_uuid) = query.project_uuid {
            sql.push_str(" AND project_uuid = ?");
            bind_values.push(Value::Text(project_uuid.to_string()));
        }
        if let Some(context_uuid) = query.context_uuid {
            sql.push_str(" AND context_uuid = ?");
            bind_values.push(Value::Text(context_uuid.to_string()));
        }
        if let Some(completed) = query.completed {
            sql.push_str(" AND is_completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        sql.push_str(" ORDER BY due_at IS NULL ASC, due_at ASC, created_at ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_action_row(row)?);
        }
        Ok(items)
    }

    fn soft_delete_action(&self, id: ItemId, at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE action_items
             SET
                is_deleted = 1,
                deleted_at = ?2,
                updated_at = ?3
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), at, now_epoch_ms()],
        )?;
        require_row_if_unchanged(self.conn, changed, ItemRef::new(ItemKind::ActionItem, id))
    }

    fn restore_action(&self, id: ItemId) -> RepoResult<ActionItem> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM action_items WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::NotFound(ItemRef::new(ItemKind::ActionItem, id)));
        }

        tx.execute(
            "UPDATE action_items
             SET
                is_deleted = 0,
                deleted_at = NULL,
                project_uuid = CASE
                    WHEN project_uuid IS NOT NULL AND NOT EXISTS(
                        SELECT 1
                        FROM projects p
                        WHERE p.uuid = action_items.project_uuid
                          AND p.is_deleted = 0
                    ) THEN NULL
                    ELSE project_uuid
                END,
                updated_at = ?2
             WHERE uuid = ?1
               AND is_deleted = 1;",
            params![id.to_string(), now_epoch_ms()],
        )?;
        tx.commit()?;

        self.get_action(id, false)?
            .ok_or(RepoError::NotFound(ItemRef::new(ItemKind::ActionItem, id)))
    }
}

fn parse_action_row(row: &Row<'_>) -> RepoResult<ActionItem> {
    let uuid_text: String = row.get("uuid")?;
    let item = ActionItem {
        uuid: parse_uuid(&uuid_text, "action_items.uuid")?,
        description: row.get("description")?,
        notes: row.get("notes")?,
        project_uuid: parse_optional_uuid(row.get("project_uuid")?, "action_items.project_uuid")?,
        context_uuid: parse_optional_uuid(row.get("context_uuid")?, "action_items.context_uuid")?,
        due_at: row.get("due_at")?,
        is_completed: parse_flag(row.get("is_completed")?, "action_items.is_completed")?,
        completed_at: row.get("completed_at")?,
        lifecycle: parse_lifecycle(row, "action_items")?,
    };
    item.validate()?;
    Ok(item)
}
