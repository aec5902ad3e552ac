//! Subcommand handlers: build services over the open connection and print
//! results.

use crate::output;
use crate::{
    ActionCommands, ActionFields, LabelCommands, ProjectCommands, ProjectFields,
    ReferenceCommands, TrashCommands,
};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use gtd_core::db::Connection;
use gtd_core::repo::action_repo::{ActionListQuery, SqliteActionRepository};
use gtd_core::repo::archive_repo::SqliteArchiveRepository;
use gtd_core::repo::label_repo::SqliteLabelRepository;
use gtd_core::repo::project_repo::{ProjectListQuery, SqliteProjectRepository};
use gtd_core::repo::reference_repo::SqliteReferenceRepository;
use gtd_core::repo::trash_repo::SqliteTrashRepository;
use gtd_core::search::index::rebuild_index;
use gtd_core::service::action_service::{ActionPatch, ActionService, NewAction};
use gtd_core::service::archive_service::ArchiveService;
use gtd_core::service::label_service::LabelService;
use gtd_core::service::outline_service::OutlineService;
use gtd_core::service::project_service::{NewProject, ProjectPatch, ProjectService};
use gtd_core::service::reference_service::{NewReference, ReferencePatch, ReferenceService};
use gtd_core::service::trash_service::TrashService;
use gtd_core::view::OutlineGrouping;
use gtd_core::{ItemId, ItemKind, ItemRef, LabelKind, SearchQuery, SearchWorker};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

type Labels<'conn> = LabelService<SqliteLabelRepository<'conn>>;
type Projects<'conn> = ProjectService<SqliteProjectRepository<'conn>>;

/// `clap` value parser for item kinds.
pub fn parse_kind(value: &str) -> std::result::Result<ItemKind, String> {
    let normalized = match value {
        "action" => "action_item",
        "ref" | "reference" => "reference_item",
        other => other,
    };
    ItemKind::parse(normalized).ok_or_else(|| {
        format!(
            "unknown kind `{value}`, expected one of: {}",
            ItemKind::ALL.map(ItemKind::as_str).join(", ")
        )
    })
}

/// `clap` value parser for `YYYY-MM-DD` due dates, as epoch ms at UTC
/// midnight.
pub fn parse_due(value: &str) -> std::result::Result<i64, String> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid date `{value}`: {err}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .ok_or_else(|| format!("invalid date `{value}`"))
}

fn parse_id(value: &str) -> Result<ItemId> {
    Uuid::parse_str(value.trim()).with_context(|| format!("`{value}` is not a valid id"))
}

fn labels(conn: &Connection, kind: LabelKind) -> Result<Labels<'_>> {
    Ok(LabelService::new(SqliteLabelRepository::try_new(conn)?, kind))
}

fn projects(conn: &Connection) -> Result<Projects<'_>> {
    Ok(ProjectService::new(SqliteProjectRepository::try_new(conn)?))
}

fn resolve_label(service: &Labels<'_>, value: &str) -> Result<ItemId> {
    if let Ok(id) = Uuid::parse_str(value.trim()) {
        return Ok(id);
    }
    service
        .find(value)?
        .map(|label| label.uuid)
        .ok_or_else(|| anyhow!("no {} named `{value}`", service.kind().item_kind()))
}

fn resolve_project(service: &Projects<'_>, value: &str) -> Result<ItemId> {
    if let Ok(id) = Uuid::parse_str(value.trim()) {
        return Ok(id);
    }
    service
        .find(value)?
        .map(|project| project.uuid)
        .ok_or_else(|| anyhow!("no project named `{value}`"))
}

fn resolve_optional_label(
    conn: &Connection,
    kind: LabelKind,
    value: Option<&str>,
) -> Result<Option<ItemId>> {
    match value {
        Some(value) => Ok(Some(resolve_label(&labels(conn, kind)?, value)?)),
        None => Ok(None),
    }
}

fn resolve_optional_project(conn: &Connection, value: Option<&str>) -> Result<Option<ItemId>> {
    match value {
        Some(value) => Ok(Some(resolve_project(&projects(conn)?, value)?)),
        None => Ok(None),
    }
}

/// `--x` sets, `--no-x` clears, neither leaves untouched.
fn patch_value<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

pub fn label(conn: &Connection, kind: LabelKind, command: LabelCommands) -> Result<()> {
    let service = labels(conn, kind)?;
    match command {
        LabelCommands::Add { name, description } => {
            let label = service.add(&name, &description)?;
            output::print_label(&label);
        }
        LabelCommands::List { all } => {
            for label in service.list(all)? {
                output::print_label(&label);
            }
        }
        LabelCommands::Rename { label, name } => {
            let id = resolve_label(&service, &label)?;
            output::print_label(&service.rename(id, &name)?);
        }
        LabelCommands::Describe { label, description } => {
            let id = resolve_label(&service, &label)?;
            output::print_label(&service.describe(id, &description)?);
        }
        LabelCommands::Trash { label } => {
            let id = resolve_label(&service, &label)?;
            service.trash(id)?;
            println!("trashed {}", ItemRef::new(kind.item_kind(), id));
        }
        LabelCommands::Restore { id } => {
            output::print_label(&service.restore(parse_id(&id)?)?);
        }
    }
    Ok(())
}

pub fn project(conn: &Connection, command: ProjectCommands) -> Result<()> {
    let service = projects(conn)?;
    match command {
        ProjectCommands::Add { name, fields } => {
            let ProjectFields {
                description,
                category,
                due,
                ..
            } = fields;
            let project = service.add(NewProject {
                name,
                description: description.unwrap_or_default(),
                category_uuid: resolve_optional_label(conn, LabelKind::Category, category.as_deref())?,
                due_at: due,
            })?;
            output::print_project(&project);
        }
        ProjectCommands::List {
            done,
            all,
            category,
        } => {
            let completed = match (done, all) {
                (_, true) => None,
                (true, false) => Some(true),
                (false, false) => Some(false),
            };
            let query = ProjectListQuery {
                category_uuid: resolve_optional_label(
                    conn,
                    LabelKind::Category,
                    category.as_deref(),
                )?,
                completed,
                include_deleted: false,
            };
            for project in service.list(&query)? {
                output::print_project(&project);
            }
        }
        ProjectCommands::Show { project } => {
            let id = resolve_project(&service, &project)?;
            let project = service
                .get(id)?
                .ok_or_else(|| anyhow!("project {id} not found"))?;
            output::print_project(&project);
            if !project.description.is_empty() {
                println!("    {}", project.description);
            }
            let actions = ActionService::new(SqliteActionRepository::try_new(conn)?);
            for item in actions.by_project(id)? {
                print!("    ");
                output::print_action(&item);
            }
        }
        ProjectCommands::Edit {
            project,
            name,
            fields,
        } => {
            let id = resolve_project(&service, &project)?;
            let category = resolve_optional_label(
                conn,
                LabelKind::Category,
                fields.category.as_deref(),
            )?;
            let project = service.edit(
                id,
                ProjectPatch {
                    name,
                    description: fields.description,
                    category_uuid: patch_value(category, fields.no_category),
                    due_at: patch_value(fields.due, fields.no_due),
                },
            )?;
            output::print_project(&project);
        }
        ProjectCommands::Done { project } => {
            let id = resolve_project(&service, &project)?;
            let cascade = service.complete(id)?;
            output::print_project(&cascade.project);
            println!("completed {} action item(s) with it", cascade.action_items);
        }
        ProjectCommands::Reopen { project } => {
            let id = resolve_project(&service, &project)?;
            let cascade = service.reopen(id)?;
            output::print_project(&cascade.project);
            println!("reopened {} action item(s) with it", cascade.action_items);
        }
        ProjectCommands::Trash { project } => {
            let id = resolve_project(&service, &project)?;
            let cascade = service.trash(id)?;
            println!(
                "trashed {} and {} action item(s)",
                ItemRef::new(ItemKind::Project, cascade.project.uuid),
                cascade.action_items
            );
        }
        ProjectCommands::Restore { id } => {
            let cascade = service.restore(parse_id(&id)?)?;
            output::print_project(&cascade.project);
            println!("restored {} action item(s) with it", cascade.action_items);
        }
    }
    Ok(())
}

pub fn action(conn: &Connection, command: ActionCommands) -> Result<()> {
    let service = ActionService::new(SqliteActionRepository::try_new(conn)?);
    match command {
        ActionCommands::Add {
            description,
            fields,
        } => {
            let item = service.add(NewAction {
                description,
                notes: fields.notes.unwrap_or_default(),
                project_uuid: resolve_optional_project(conn, fields.project.as_deref())?,
                context_uuid: resolve_optional_label(
                    conn,
                    LabelKind::Context,
                    fields.context.as_deref(),
                )?,
                due_at: fields.due,
            })?;
            output::print_action(&item);
        }
        ActionCommands::List {
            inbox,
            project,
            context,
            done,
            limit,
        } => {
            let query = ActionListQuery {
                project_uuid: resolve_optional_project(conn, project.as_deref())?,
                context_uuid: resolve_optional_label(conn, LabelKind::Context, context.as_deref())?,
                inbox_only: inbox,
                completed: Some(done),
                include_deleted: false,
                limit,
                offset: 0,
            };
            for item in service.list(&query)? {
                output::print_action(&item);
            }
        }
        ActionCommands::Show { id } => {
            let id = parse_id(&id)?;
            let item = service
                .get(id)?
                .ok_or_else(|| anyhow!("action item {id} not found"))?;
            output::print_action(&item);
            if !item.notes.is_empty() {
                println!("    {}", item.notes);
            }
        }
        ActionCommands::Edit {
            id,
            description,
            fields,
        } => {
            let patch = action_patch(conn, description, fields)?;
            output::print_action(&service.edit(parse_id(&id)?, patch)?);
        }
        ActionCommands::Move {
            id,
            project,
            context,
        } => {
            let item = service.move_to(
                parse_id(&id)?,
                resolve_optional_project(conn, project.as_deref())?,
                resolve_optional_label(conn, LabelKind::Context, context.as_deref())?,
            )?;
            output::print_action(&item);
        }
        ActionCommands::Done { id } => output::print_action(&service.complete(parse_id(&id)?)?),
        ActionCommands::Reopen { id } => output::print_action(&service.reopen(parse_id(&id)?)?),
        ActionCommands::Trash { id } => {
            let id = parse_id(&id)?;
            service.trash(id)?;
            println!("trashed {}", ItemRef::new(ItemKind::ActionItem, id));
        }
        ActionCommands::Restore { id } => output::print_action(&service.restore(parse_id(&id)?)?),
    }
    Ok(())
}

fn action_patch(
    conn: &Connection,
    description: Option<String>,
    fields: ActionFields,
) -> Result<ActionPatch> {
    Ok(ActionPatch {
        description,
        notes: fields.notes,
        project_uuid: resolve_optional_project(conn, fields.project.as_deref())?.map(Some),
        context_uuid: resolve_optional_label(conn, LabelKind::Context, fields.context.as_deref())?
            .map(Some),
        due_at: patch_value(fields.due, fields.no_due),
    })
}

pub fn reference(conn: &Connection, command: ReferenceCommands) -> Result<()> {
    let service = ReferenceService::new(SqliteReferenceRepository::try_new(conn)?);
    match command {
        ReferenceCommands::Add {
            title,
            body,
            url,
            category,
            tags,
        } => {
            let item = service.add(NewReference {
                title,
                body,
                url,
                category_uuid: resolve_optional_label(conn, LabelKind::Category, category.as_deref())?,
                tags,
            })?;
            output::print_reference(&item);
        }
        ReferenceCommands::List {
            tag,
            category,
            limit,
            offset,
        } => {
            let category_uuid =
                resolve_optional_label(conn, LabelKind::Category, category.as_deref())?;
            let result = service.list(tag, category_uuid, limit, offset)?;
            for item in &result.items {
                output::print_reference(item);
            }
            if result.items.len() == result.applied_limit as usize {
                println!("(showing {}; use --offset for more)", result.applied_limit);
            }
        }
        ReferenceCommands::Show { id } => {
            let id = parse_id(&id)?;
            let item = service
                .get(id)?
                .ok_or_else(|| anyhow!("reference item {id} not found"))?;
            output::print_reference(&item);
            if !item.body.is_empty() {
                println!();
                println!("{}", item.body);
            }
        }
        ReferenceCommands::Edit {
            id,
            title,
            body,
            url,
            no_url,
            category,
            no_category,
        } => {
            let category = resolve_optional_label(conn, LabelKind::Category, category.as_deref())?;
            let item = service.edit(
                parse_id(&id)?,
                ReferencePatch {
                    title,
                    body,
                    url: patch_value(url, no_url),
                    category_uuid: patch_value(category, no_category),
                },
            )?;
            output::print_reference(&item);
        }
        ReferenceCommands::Tag { id, tags } => {
            output::print_reference(&service.set_tags(parse_id(&id)?, tags)?);
        }
        ReferenceCommands::Tags => {
            for tag in service.list_tags()? {
                println!("{tag}");
            }
        }
        ReferenceCommands::Trash { id } => {
            let id = parse_id(&id)?;
            service.trash(id)?;
            println!("trashed {}", ItemRef::new(ItemKind::ReferenceItem, id));
        }
        ReferenceCommands::Restore { id } => {
            output::print_reference(&service.restore(parse_id(&id)?)?);
        }
    }
    Ok(())
}

pub fn trash(conn: &Connection, command: TrashCommands) -> Result<()> {
    let service = TrashService::new(SqliteTrashRepository::try_new(conn)?);
    match command {
        TrashCommands::List => {
            for entry in service.list()? {
                output::print_trash_entry(&entry);
            }
        }
        TrashCommands::Restore { kind, id } => {
            let item = ItemRef::new(kind, parse_id(&id)?);
            let cascaded = service.restore(item)?;
            println!("restored {item} ({cascaded} action item(s) with it)");
        }
        TrashCommands::Purge { kind, id } => {
            let item = ItemRef::new(kind, parse_id(&id)?);
            service.purge(item)?;
            println!("purged {item}");
        }
        TrashCommands::Empty => {
            let summary = service.empty()?;
            for kind in ItemKind::ALL {
                let count = summary.count(kind);
                if count > 0 {
                    println!("{kind}: {count}");
                }
            }
            println!(
                "purged {} item(s), removed {} unused tag(s)",
                summary.total(),
                summary.orphan_tags_removed
            );
        }
    }
    Ok(())
}

pub fn archive(conn: &Connection, limit: Option<u32>) -> Result<()> {
    let service = ArchiveService::new(SqliteArchiveRepository::try_new(conn)?);
    for entry in service.list(limit)? {
        output::print_archive_entry(&entry);
    }
    Ok(())
}

pub fn search(
    db_path: &Path,
    text: String,
    kind: Option<ItemKind>,
    limit: u32,
    raw: bool,
) -> Result<()> {
    let worker = SearchWorker::spawn(db_path).context("failed to start search worker")?;
    let mut query = SearchQuery::new(text).with_limit(limit);
    query.raw_fts_syntax = raw;
    if let Some(kind) = kind {
        query = query.with_kind(kind);
    }

    let generation = worker.submit(query)?;
    let hits = worker.wait_for(generation, SEARCH_TIMEOUT)?;
    worker.shutdown();

    if hits.is_empty() {
        println!("no matches");
    }
    for hit in &hits {
        output::print_search_hit(hit);
    }
    Ok(())
}

pub fn outline(conn: &Connection, by: &str) -> Result<()> {
    let grouping = match by {
        "context" => OutlineGrouping::ByContext,
        _ => OutlineGrouping::ByProject,
    };
    let service = OutlineService::new(
        SqliteActionRepository::try_new(conn)?,
        SqliteProjectRepository::try_new(conn)?,
        SqliteLabelRepository::try_new(conn)?,
    );
    output::print_outline(&service.build(grouping)?);
    Ok(())
}

pub fn reindex(conn: &Connection) -> Result<()> {
    let rows = rebuild_index(conn).context("failed to rebuild search index")?;
    println!("indexed {rows} row(s)");
    Ok(())
}
