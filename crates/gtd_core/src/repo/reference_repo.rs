//! Reference item/tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over `reference_items`.
//! - Own tag-link replacement with atomic semantics.
//!
//! # Invariants
//! - Create/update write the row and its full tag set in one transaction.
//! - Tag names are normalized to lowercase before persistence.

use crate::model::item::{now_epoch_ms, ItemId, ItemKind, ItemRef};
use crate::model::reference::ReferenceItem;
use crate::repo::{
    bool_to_int, ensure_connection_ready, load_parent_state, parse_lifecycle,
    parse_optional_uuid, parse_uuid, require_row_if_unchanged, uuid_to_db, ParentState, RepoError,
    RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;

const REFERENCE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    body,
    url,
    preview_text,
    category_uuid,
    is_deleted,
    deleted_at,
    created_at,
    updated_at
FROM reference_items";

/// Query options for listing reference items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceListQuery {
    /// Optional single-tag exact match filter.
    pub tag: Option<String>,
    pub category_uuid: Option<ItemId>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for reference items and tags.
pub trait ReferenceRepository {
    fn create_reference(&self, item: &ReferenceItem) -> RepoResult<ItemId>;
    fn update_reference(&self, item: &ReferenceItem) -> RepoResult<()>;
    fn get_reference(&self, id: ItemId, include_deleted: bool)
        -> RepoResult<Option<ReferenceItem>>;
    fn list_references(&self, query: &ReferenceListQuery) -> RepoResult<Vec<ReferenceItem>>;
    /// Replaces all tags for one active reference item in one transaction.
    fn set_reference_tags(&self, id: ItemId, tags: &[String]) -> RepoResult<()>;
    /// Returns all known tags sorted by name.
    fn list_tags(&self) -> RepoResult<Vec<String>>;
    fn soft_delete_reference(&self, id: ItemId, at: i64) -> RepoResult<()>;
    fn restore_reference(&self, id: ItemId) -> RepoResult<()>;
    /// State of the category a reference item is about to be filed under.
    fn parent_state(&self, parent: ItemRef) -> RepoResult<ParentState>;
}

/// SQLite-backed reference repository.
pub struct SqliteReferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferenceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_row(&self, row: &Row<'_>) -> RepoResult<ReferenceItem> {
        let mut item = parse_reference_row(row)?;
        item.tags = load_tags_for_reference(self.conn, &item.uuid.to_string())?;
        Ok(item)
    }
}

impl ReferenceRepository for SqliteReferenceRepository<'_> {
    fn parent_state(&self, parent: ItemRef) -> RepoResult<ParentState> {
        load_parent_state(self.conn, parent)
    }

    fn create_reference(&self, item: &ReferenceItem) -> RepoResult<ItemId> {
        item.validate()?;
        let tags = normalize_tags(&item.tags);

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO reference_items (
                uuid,
                title,
                body,
                url,
                preview_text,
                category_uuid,
                is_deleted,
                deleted_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                item.uuid.to_string(),
                item.title.as_str(),
                item.body.as_str(),
                item.url.as_deref(),
                item.preview_text.as_deref(),
                uuid_to_db(item.category_uuid),
                bool_to_int(item.lifecycle.is_deleted),
                item.lifecycle.deleted_at,
                item.lifecycle.created_at,
                item.lifecycle.updated_at,
            ],
        )?;
        replace_tags_in_tx(&tx, &item.uuid.to_string(), &tags)?;
        tx.commit()?;

        Ok(item.uuid)
    }

    fn update_reference(&self, item: &ReferenceItem) -> RepoResult<()> {
        item.validate()?;
        let tags = normalize_tags(&item.tags);
        let uuid = item.uuid.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE reference_items
             SET
                title = ?1,
                body = ?2,
                url = ?3,
                preview_text = ?4,
                category_uuid = ?5,
                is_deleted = ?6,
                deleted_at = ?7,
                updated_at = ?8
             WHERE uuid = ?9;",
            params![
                item.title.as_str(),
                item.body.as_str(),
                item.url.as_deref(),
                item.preview_text.as_deref(),
                uuid_to_db(item.category_uuid),
                bool_to_int(item.lifecycle.is_deleted),
                item.lifecycle.deleted_at,
                now_epoch_ms(),
                uuid.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(ItemRef::new(
                ItemKind::ReferenceItem,
                item.uuid,
            )));
        }
        replace_tags_in_tx(&tx, &uuid, &tags)?;
        tx.commit()?;
        Ok(())
    }

    fn get_reference(
        &self,
        id: ItemId,
        include_deleted: bool,
    ) -> RepoResult<Option<ReferenceItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REFERENCE_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.load_row(row)?));
        }
        Ok(None)
    }

    fn list_references(&self, query: &ReferenceListQuery) -> RepoResult<Vec<ReferenceItem>> {
        let mut sql = format!("{REFERENCE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }
        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM reference_tags rt
                    INNER JOIN tags t ON t.id = rt.tag_id
                    WHERE rt.reference_uuid = reference_items.uuid
                      AND t.name = ? COLLATE NOCASE
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }
        if let Some(category_uuid) = query.category_uuid {
            sql.push_str(" AND category_uuid = ?");
            bind_values.push(Value::Text(category_uuid.to_string()));
        }

        sql.push_str(" ORDER BY updated_at DESC, uuid ASC");

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
            items.push(self.load_row(row)?);
        }
        Ok(items)
    }

    fn set_reference_tags(&self, id: ItemId, tags: &[String]) -> RepoResult<()> {
        let uuid = id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM reference_items
                WHERE uuid = ?1
                  AND is_deleted = 0
            );",
            [uuid.as_str()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound(ItemRef::new(ItemKind::ReferenceItem, id)));
        }

        replace_tags_in_tx(&tx, &uuid, &normalize_tags(tags))?;
        tx.execute(
            "UPDATE reference_items
             SET updated_at = ?2
             WHERE uuid = ?1;",
            params![uuid.as_str(), now_epoch_ms()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_tags(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM tags ORDER BY name COLLATE NOCASE ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get("name")?;
            tags.push(value.to_lowercase());
        }
        Ok(tags)
    }

    fn soft_delete_reference(&self, id: ItemId, at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE reference_items
             SET
                is_deleted = 1,
                deleted_at = ?2,
                updated_at = ?3
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), at, now_epoch_ms()],
        )?;
        require_row_if_unchanged(self.conn, changed, ItemRef::new(ItemKind::ReferenceItem, id))
    }

    fn restore_reference(&self, id: ItemId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE reference_items
             SET
                is_deleted = 0,
                deleted_at = NULL,
                updated_at = ?2
             WHERE uuid = ?1
               AND is_deleted = 1;",
            params![id.to_string(), now_epoch_ms()],
        )?;
        require_row_if_unchanged(self.conn, changed, ItemRef::new(ItemKind::ReferenceItem, id))
    }
}

/// Normalizes one tag value: trimmed, lowercase, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

fn replace_tags_in_tx(tx: &Transaction<'_>, reference_uuid: &str, tags: &[String]) -> RepoResult<()> {
    tx.execute(
        "DELETE FROM reference_tags WHERE reference_uuid = ?1;",
        [reference_uuid],
    )?;

    for tag in tags {
        tx.execute(
            "INSERT OR IGNORE INTO tags (name) VALUES (?1);",
            [tag.as_str()],
        )?;
        tx.execute(
            "INSERT INTO reference_tags (reference_uuid, tag_id)
             SELECT ?1, id
             FROM tags
             WHERE name = ?2 COLLATE NOCASE;",
            params![reference_uuid, tag.as_str()],
        )?;
    }
    Ok(())
}

fn load_tags_for_reference(conn: &Connection, reference_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM reference_tags rt
         INNER JOIN tags t ON t.id = rt.tag_id
         WHERE rt.reference_uuid = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([reference_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn parse_reference_row(row: &Row<'_>) -> RepoResult<ReferenceItem> {
    let uuid_text: String = row.get("uuid")?;
    let item = ReferenceItem {
        uuid: parse_uuid(&uuid_text, "reference_items.uuid")?,
        title: row.get("title")?,
        body: row.get("body")?,
        url: row.get("url")?,
        preview_text: row.get("preview_text")?,
        category_uuid: parse_optional_uuid(
            row.get("category_uuid")?,
            "reference_items.category_uuid",
        )?,
        tags: Vec::new(),
        lifecycle: parse_lifecycle(row, "reference_items")?,
    };
    item.validate()?;
    Ok(item)
}
