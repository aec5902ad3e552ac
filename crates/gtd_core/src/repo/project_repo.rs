//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over `projects`.
//! - Own the project cascades onto `action_items` (trash/restore,
//!   complete/reopen) so each one is a single transaction.
//!
//! # Invariants
//! - A cascade stamps the project and every affected action item with the
//!   same timestamp; the reverse operation matches on that timestamp, so
//!   items trashed or completed on their own are left alone.

use crate::model::item::{now_epoch_ms, ItemId, ItemKind, ItemRef};
use crate::model::project::Project;
use crate::repo::{
    bool_to_int, ensure_connection_ready, load_parent_state, parse_flag, parse_lifecycle,
    parse_optional_uuid, parse_uuid, uuid_to_db, ParentState, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    category_uuid,
    due_at,
    is_completed,
    completed_at,
    is_deleted,
    deleted_at,
    created_at,
    updated_at
FROM projects";

/// Query options for listing projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    pub category_uuid: Option<ItemId>,
    /// `Some(false)` = open projects, `Some(true)` = archived ones.
    pub completed: Option<bool>,
    pub include_deleted: bool,
}

/// Repository interface for projects.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ItemId>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<Project>>;
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    /// Trashes the project and its active action items. Returns the number
    /// of action items trashed with it.
    fn soft_delete_project(&self, id: ItemId, at: i64) -> RepoResult<usize>;
    /// Restores the project and the action items trashed with it.
    fn restore_project(&self, id: ItemId) -> RepoResult<usize>;
    /// Completes the project and its open action items.
    fn complete_project(&self, id: ItemId, at: i64) -> RepoResult<usize>;
    /// Reopens the project and the action items completed with it.
    fn reopen_project(&self, id: ItemId) -> RepoResult<usize>;
    /// State of the category a project is about to be filed under.
    fn parent_state(&self, parent: ItemRef) -> RepoResult<ParentState>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn require_project(&self, id: ItemId) -> RepoResult<Project> {
        self.get_project(id, true)?
            .ok_or(RepoError::NotFound(ItemRef::new(ItemKind::Project, id)))
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn parent_state(&self, parent: ItemRef) -> RepoResult<ParentState> {
        load_parent_state(self.conn, parent)
    }

    fn create_project(&self, project: &Project) -> RepoResult<ItemId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                uuid,
                name,
                description,
                category_uuid,
                due_at,
                is_completed,
                completed_at,
                is_deleted,
                deleted_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                project.uuid.to_string(),
                project.name.as_str(),
                project.description.as_str(),
                uuid_to_db(project.category_uuid),
                project.due_at,
                bool_to_int(project.is_completed),
                project.completed_at,
                bool_to_int(project.lifecycle.is_deleted),
                project.lifecycle.deleted_at,
                project.lifecycle.created_at,
                project.lifecycle.updated_at,
            ],
        )?;

        Ok(project.uuid)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let changed = self.conn.execute(
            "UPDATE projects
             SET
                name = ?1,
                description = ?2,
                category_uuid = ?3,
                due_at = ?4,
                is_completed = ?5,
                completed_at = ?6,
                is_deleted = ?7,
                deleted_at = ?8,
                updated_at = ?9
             WHERE uuid = ?10;",
            params![
                project.name.as_str(),
                project.description.as_str(),
                uuid_to_db(project.category_uuid),
                project.due_at,
                bool_to_int(project.is_completed),
                project.completed_at,
                bool_to_int(project.lifecycle.is_deleted),
                project.lifecycle.deleted_at,
                now_epoch_ms(),
                project.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(ItemRef::new(
                ItemKind::Project,
                project.uuid,
            )));
        }
        Ok(())
    }

    fn get_project(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }
        if let Some(category_uuid) = query.category_uuid {
            sql.push_str(" AND category_uuid = ?");
            bind_values.push(Value::Text(category_uuid.to_string()));
        }
        if let Some(completed) = query.completed {
            sql.push_str(" AND is_completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn soft_delete_project(&self, id: ItemId, at: i64) -> RepoResult<usize> {
        let project = self.require_project(id)?;
        if !project.is_active() {
            return Ok(0);
        }

        let now = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE projects
             SET
                is_deleted = 1,
                deleted_at = ?2,
                updated_at = ?3
             WHERE uuid = ?1;",
            params![id.to_string(), at, now],
        )?;
        let cascaded = tx.execute(
            "UPDATE action_items
             SET
                is_deleted = 1,
                deleted_at = ?2,
                updated_at = ?3
             WHERE project_uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), at, now],
        )?;
        tx.commit()?;
        Ok(cascaded)
    }

    fn restore_project(&self, id: ItemId) -> RepoResult<usize> {
        let project = self.require_project(id)?;
        let Some(deleted_at) = project.lifecycle.deleted_at else {
            return Ok(0);
        };

        let now = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE projects
             SET
                is_deleted = 0,
                deleted_at = NULL,
                updated_at = ?2
             WHERE uuid = ?1;",
            params![id.to_string(), now],
        )?;
        let cascaded = tx.execute(
            "UPDATE action_items
             SET
                is_deleted = 0,
                deleted_at = NULL,
                updated_at = ?3
             WHERE project_uuid = ?1
               AND is_deleted = 1
               AND deleted_at = ?2;",
            params![id.to_string(), deleted_at, now],
        )?;
        tx.commit()?;
        Ok(cascaded)
    }

    fn complete_project(&self, id: ItemId, at: i64) -> RepoResult<usize> {
        let project = self
            .get_project(id, false)?
            .ok_or(RepoError::NotFound(ItemRef::new(ItemKind::Project, id)))?;
        if project.is_completed {
            return Ok(0);
        }

        let now = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE projects
             SET
                is_completed = 1,
                completed_at = ?2,
                updated_at = ?3
             WHERE uuid = ?1;",
            params![id.to_string(), at, now],
        )?;
        let cascaded = tx.execute(
            "UPDATE action_items
             SET
                is_completed = 1,
                completed_at = ?2,
                updated_at = ?3
             WHERE project_uuid = ?1
               AND is_completed = 0
               AND is_deleted = 0;",
            params![id.to_string(), at, now],
        )?;
        tx.commit()?;
        Ok(cascaded)
    }

    fn reopen_project(&self, id: ItemId) -> RepoResult<usize> {
        let project = self
            .get_project(id, false)?
            .ok_or(RepoError::NotFound(ItemRef::new(ItemKind::Project, id)))?;
        let Some(completed_at) = project.completed_at else {
            return Ok(0);
        };

        let now = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE projects
             SET
                is_completed = 0,
                completed_at = NULL,
                updated_at = ?2
             WHERE uuid = ?1;",
            params![id.to_string(), now],
        )?;
        let cascaded = tx.execute(
            "UPDATE action_items
             SET
                is_completed = 0,
                completed_at = NULL,
                updated_at = ?3
             WHERE project_uuid = ?1
               AND is_completed = 1
               AND completed_at = ?2
               AND is_deleted = 0;",
            params![id.to_string(), completed_at, now],
        )?;
        tx.commit()?;
        Ok(cascaded)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("uuid")?;
    let project = Project {
        uuid: parse_uuid(&uuid_text, "projects.uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        category_uuid: parse_optional_uuid(row.get("category_uuid")?, "projects.category_uuid")?,
        due_at: row.get("due_at")?,
        is_completed: parse_flag(row.get("is_completed")?, "projects.is_completed")?,
        completed_at: row.get("completed_at")?,
        lifecycle: parse_lifecycle(row, "projects")?,
    };
    project.validate()?;
    Ok(project)
}
