//! Context/category repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - CRUD and soft-delete over the `contexts` and `categories` tables.
//!
//! # Invariants
//! - Active names are unique per kind, case-insensitively. Violations are
//!   reported as `RepoError::DuplicateName`, including on restore.
//! - Soft delete is idempotent and keeps the first `deleted_at`.

use crate::model::item::{now_epoch_ms, ItemId, ItemRef};
use crate::model::label::{Label, LabelKind};
use crate::repo::{
    bool_to_int, ensure_connection_ready, is_unique_violation, parse_lifecycle, parse_uuid,
    require_row_if_unchanged, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

/// Repository interface for contexts and categories.
pub trait LabelRepository {
    fn create_label(&self, label: &Label) -> RepoResult<ItemId>;
    fn update_label(&self, label: &Label) -> RepoResult<()>;
    fn get_label(
        &self,
        kind: LabelKind,
        id: ItemId,
        include_deleted: bool,
    ) -> RepoResult<Option<Label>>;
    /// Case-insensitive lookup among active labels.
    fn find_label_by_name(&self, kind: LabelKind, name: &str) -> RepoResult<Option<Label>>;
    fn list_labels(&self, kind: LabelKind, include_deleted: bool) -> RepoResult<Vec<Label>>;
    fn soft_delete_label(&self, kind: LabelKind, id: ItemId, at: i64) -> RepoResult<()>;
    fn restore_label(&self, kind: LabelKind, id: ItemId) -> RepoResult<()>;
}

/// SQLite-backed label repository.
pub struct SqliteLabelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLabelRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

fn table(kind: LabelKind) -> &'static str {
    kind.item_kind().table()
}

fn select_sql(kind: LabelKind) -> String {
    format!(
        "SELECT uuid, name, description, is_deleted, deleted_at, created_at, updated_at
         FROM {}",
        table(kind)
    )
}

fn map_write_error(err: rusqlite::Error, label: &Label) -> RepoError {
    if is_unique_violation(&err) {
        return RepoError::DuplicateName {
            kind: label.kind,
            name: label.name.clone(),
        };
    }
    err.into()
}

impl LabelRepository for SqliteLabelRepository<'_> {
    fn create_label(&self, label: &Label) -> RepoResult<ItemId> {
        label.validate()?;

        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} (
                        uuid,
                        name,
                        description,
                        is_deleted,
                        deleted_at,
                        created_at,
                        updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                    table(label.kind)
                ),
                params![
                    label.uuid.to_string(),
                    label.name.as_str(),
                    label.description.as_str(),
                    bool_to_int(label.lifecycle.is_deleted),
                    label.lifecycle.deleted_at,
                    label.lifecycle.created_at,
                    label.lifecycle.updated_at,
                ],
            )
            .map_err(|err| map_write_error(err, label))?;

        Ok(label.uuid)
    }

    fn update_label(&self, label: &Label) -> RepoResult<()> {
        label.validate()?;

        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {}
                     SET
                        name = ?1,
                        description = ?2,
                        is_deleted = ?3,
                        deleted_at = ?4,
                        updated_at = ?5
                     WHERE uuid = ?6;",
                    table(label.kind)
                ),
                params![
                    label.name.as_str(),
                    label.description.as_str(),
                    bool_to_int(label.lifecycle.is_deleted),
                    label.lifecycle.deleted_at,
                    now_epoch_ms(),
                    label.uuid.to_string(),
                ],
            )
            .map_err(|err| map_write_error(err, label))?;

        if changed == 0 {
            return Err(RepoError::NotFound(ItemRef::new(
                label.kind.item_kind(),
                label.uuid,
            )));
        }
        Ok(())
    }

    fn get_label(
        &self,
        kind: LabelKind,
        id: ItemId,
        include_deleted: bool,
    ) -> RepoResult<Option<Label>> {
        let mut stmt = self.conn.prepare(&format!(
            "{}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);",
            select_sql(kind)
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_label_row(row, kind)?));
        }
        Ok(None)
    }

    fn find_label_by_name(&self, kind: LabelKind, name: &str) -> RepoResult<Option<Label>> {
        let mut stmt = self.conn.prepare(&format!(
            "{}
             WHERE name = ?1 COLLATE NOCASE
               AND is_deleted = 0;",
            select_sql(kind)
        ))?;
        let mut rows = stmt.query([name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_label_row(row, kind)?));
        }
        Ok(None)
    }

    fn list_labels(&self, kind: LabelKind, include_deleted: bool) -> RepoResult<Vec<Label>> {
        let mut stmt = self.conn.prepare(&format!(
            "{}
             WHERE (?1 = 1 OR is_deleted = 0)
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;",
            select_sql(kind)
        ))?;
        let mut rows = stmt.query([bool_to_int(include_deleted)])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(parse_label_row(row, kind)?);
        }
        Ok(labels)
    }

    fn soft_delete_label(&self, kind: LabelKind, id: ItemId, at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {}
                 SET
                    is_deleted = 1,
                    deleted_at = ?2,
                    updated_at = ?3
                 WHERE uuid = ?1
                   AND is_deleted = 0;",
                table(kind)
            ),
            params![id.to_string(), at, now_epoch_ms()],
        )?;
        require_row_if_unchanged(self.conn, changed, ItemRef::new(kind.item_kind(), id))
    }

    fn restore_label(&self, kind: LabelKind, id: ItemId) -> RepoResult<()> {
        let label = self
            .get_label(kind, id, true)?
            .ok_or(RepoError::NotFound(ItemRef::new(kind.item_kind(), id)))?;
        if label.is_active() {
            return Ok(());
        }

        self.conn
            .execute(
                &format!(
                    "UPDATE {}
                     SET
                        is_deleted = 0,
                        deleted_at = NULL,
                        updated_at = ?2
                     WHERE uuid = ?1;",
                    table(kind)
                ),
                params![id.to_string(), now_epoch_ms()],
            )
            .map_err(|err| map_write_error(err, &label))?;
        Ok(())
    }
}

fn parse_label_row(row: &Row<'_>, kind: LabelKind) -> RepoResult<Label> {
    let uuid_text: String = row.get("uuid")?;
    let column = match kind {
        LabelKind::Context => "contexts.uuid",
        LabelKind::Category => "categories.uuid",
    };
    let label = Label {
        uuid: parse_uuid(&uuid_text, column)?,
        kind,
        name: row.get("name")?,
        description: row.get("description")?,
        lifecycle: parse_lifecycle(row, table(kind))?,
    };
    label.validate()?;
    Ok(label)
}
