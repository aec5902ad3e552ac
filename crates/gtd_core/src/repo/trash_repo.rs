//! Trash repository: cross-kind view, restore and hard deletion of
//! soft-deleted rows.
//!
//! # Invariants
//! - Only rows with `is_deleted=1` can be purged.
//! - Emptying the trash is one transaction; tags left without any
//!   reference item are removed with it.
//! - Hard deletes detach surviving children through `ON DELETE SET NULL`.

use crate::model::item::{ItemKind, ItemRef};
use crate::model::label::LabelKind;
use crate::repo::action_repo::{ActionRepository, SqliteActionRepository};
use crate::repo::label_repo::{LabelRepository, SqliteLabelRepository};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

/// One soft-deleted entity, as shown in the trash view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashEntry {
    pub item: ItemRef,
    pub title: String,
    pub deleted_at: i64,
}

/// Rows removed by one empty-trash run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrashSummary {
    pub purged: BTreeMap<ItemKind, usize>,
    pub orphan_tags_removed: usize,
}

impl TrashSummary {
    pub fn total(&self) -> usize {
        self.purged.values().sum()
    }

    pub fn count(&self, kind: ItemKind) -> usize {
        self.purged.get(&kind).copied().unwrap_or(0)
    }
}

/// Repository interface for trash maintenance.
pub trait TrashRepository {
    /// Lists trashed entities, most recently deleted first.
    fn list_trash(&self) -> RepoResult<Vec<TrashEntry>>;
    /// Brings one trashed entity back. Returns the number of action items
    /// restored along with a project.
    fn restore(&self, item: ItemRef) -> RepoResult<usize>;
    /// Hard-deletes one trashed entity.
    fn purge(&self, item: ItemRef) -> RepoResult<()>;
    /// Hard-deletes every trashed entity.
    fn empty_trash(&self) -> RepoResult<TrashSummary>;
}

/// SQLite-backed trash repository.
pub struct SqliteTrashRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTrashRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TrashRepository for SqliteTrashRepository<'_> {
    fn list_trash(&self) -> RepoResult<Vec<TrashEntry>> {
        let selects = ItemKind::ALL
            .iter()
            .map(|kind| {
                format!(
                    "SELECT '{}' AS kind, uuid, {} AS title, deleted_at
                     FROM {}
                     WHERE is_deleted = 1",
                    kind.as_str(),
                    kind.title_column(),
                    kind.table()
                )
            })
            .collect::<Vec<_>>();
        let sql = format!(
            "{} ORDER BY deleted_at DESC, uuid ASC;",
            selects.join(" UNION ALL ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let kind_text: String = row.get("kind")?;
            let kind = ItemKind::parse(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid trash kind `{kind_text}`"))
            })?;
            let uuid_text: String = row.get("uuid")?;
            let deleted_at: Option<i64> = row.get("deleted_at")?;
            entries.push(TrashEntry {
                item: ItemRef::new(kind, parse_uuid(&uuid_text, "trash.uuid")?),
                title: row.get("title")?,
                deleted_at: deleted_at.ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "trashed {kind} `{uuid_text}` has no deleted_at"
                    ))
                })?,
            });
        }
        Ok(entries)
    }

    fn restore(&self, item: ItemRef) -> RepoResult<usize> {
        let trashed: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE uuid = ?1 AND is_deleted = 1);",
                item.kind.table()
            ),
            [item.id.to_string()],
            |row| row.get(0),
        )?;
        if trashed == 0 {
            return Err(RepoError::NotFound(item));
        }

        match item.kind {
            ItemKind::Context => {
                SqliteLabelRepository::try_new(self.conn)?.restore_label(LabelKind::Context, item.id)?;
                Ok(0)
            }
            ItemKind::Category => {
                SqliteLabelRepository::try_new(self.conn)?
                    .restore_label(LabelKind::Category, item.id)?;
                Ok(0)
            }
            ItemKind::Project => SqliteProjectRepository::try_new(self.conn)?.restore_project(item.id),
            ItemKind::ActionItem => {
                SqliteActionRepository::try_new(self.conn)?.restore_action(item.id)?;
                Ok(0)
            }
            ItemKind::ReferenceItem => {
                SqliteReferenceRepository::try_new(self.conn)?.restore_reference(item.id)?;
                Ok(0)
            }
        }
    }

    fn purge(&self, item: ItemRef) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            &format!(
                "DELETE FROM {} WHERE uuid = ?1 AND is_deleted = 1;",
                item.kind.table()
            ),
            [item.id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(item));
        }
        if item.kind == ItemKind::ReferenceItem {
            remove_orphan_tags(&tx)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn empty_trash(&self) -> RepoResult<TrashSummary> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut summary = TrashSummary::default();
        for kind in ItemKind::ALL {
            let removed = tx.execute(
                &format!("DELETE FROM {} WHERE is_deleted = 1;", kind.table()),
                [],
            )?;
            summary.purged.insert(kind, removed);
        }
        summary.orphan_tags_removed = remove_orphan_tags(&tx)?;
        tx.commit()?;
        Ok(summary)
    }
}

fn remove_orphan_tags(tx: &Transaction<'_>) -> RepoResult<usize> {
    let removed = tx.execute(
        "DELETE FROM tags
         WHERE NOT EXISTS (
            SELECT 1 FROM reference_tags rt WHERE rt.tag_id = tags.id
         );",
        [],
    )?;
    Ok(removed)
}
