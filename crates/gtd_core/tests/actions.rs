use gtd_core::db::open_db_in_memory;
use gtd_core::repo::action_repo::{ActionListQuery, SqliteActionRepository};
use gtd_core::repo::label_repo::SqliteLabelRepository;
use gtd_core::repo::project_repo::SqliteProjectRepository;
use gtd_core::service::action_service::{ActionPatch, ActionService, NewAction};
use gtd_core::service::label_service::LabelService;
use gtd_core::service::project_service::{NewProject, ProjectService};
use gtd_core::{ItemKind, Label, Project, ServiceError};
use rusqlite::Connection;

fn actions(conn: &Connection) -> ActionService<SqliteActionRepository<'_>> {
    ActionService::new(SqliteActionRepository::try_new(conn).unwrap())
}

fn projects(conn: &Connection) -> ProjectService<SqliteProjectRepository<'_>> {
    ProjectService::new(SqliteProjectRepository::try_new(conn).unwrap())
}

fn project(conn: &Connection, name: &str) -> Project {
    projects(conn).add(NewProject::named(name)).unwrap()
}

fn context(conn: &Connection, name: &str) -> Label {
    LabelService::contexts(SqliteLabelRepository::try_new(conn).unwrap())
        .add(name, "")
        .unwrap()
}

fn descriptions(items: Vec<gtd_core::ActionItem>) -> Vec<String> {
    items.into_iter().map(|item| item.description).collect()
}

#[test]
fn captured_items_land_in_the_inbox() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);

    let item = service.add(NewAction::described("  call mom ")).unwrap();
    assert_eq!(item.description, "call mom");
    assert!(item.is_in_inbox());
    assert_eq!(descriptions(service.inbox().unwrap()), vec!["call mom"]);

    let err = service.add(NewAction::described("   ")).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn list_views_filter_by_project_and_context() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);
    let garden = project(&conn, "garden");
    let phone = context(&conn, "@phone");

    service
        .add(NewAction {
            project_uuid: Some(garden.uuid),
            ..NewAction::described("buy seeds")
        })
        .unwrap();
    service
        .add(NewAction {
            context_uuid: Some(phone.uuid),
            ..NewAction::described("call plumber")
        })
        .unwrap();
    let both = service
        .add(NewAction {
            project_uuid: Some(garden.uuid),
            context_uuid: Some(phone.uuid),
            ..NewAction::described("order soil")
        })
        .unwrap();
    service.add(NewAction::described("loose thought")).unwrap();
    service.complete(both.uuid).unwrap();

    assert_eq!(descriptions(service.by_project(garden.uuid).unwrap()), vec!["buy seeds"]);
    assert_eq!(descriptions(service.by_context(phone.uuid).unwrap()), vec!["call plumber"]);
    assert_eq!(descriptions(service.inbox().unwrap()), vec!["loose thought"]);

    let done = service
        .list(&ActionListQuery {
            completed: Some(true),
            ..ActionListQuery::default()
        })
        .unwrap();
    assert_eq!(descriptions(done), vec!["order soil"]);
}

#[test]
fn next_actions_are_ordered_by_due_date() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);
    for (description, due_at) in [("later", Some(3_000)), ("someday", None), ("soon", Some(1_000))] {
        service
            .add(NewAction {
                due_at,
                ..NewAction::described(description)
            })
            .unwrap();
    }

    assert_eq!(
        descriptions(service.next_actions(None).unwrap()),
        vec!["soon", "later", "someday"]
    );
    assert_eq!(descriptions(service.next_actions(Some(1)).unwrap()), vec!["soon"]);
}

#[test]
fn completed_or_trashed_parents_take_no_new_items() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);
    let done = project(&conn, "finished");
    projects(&conn).complete(done.uuid).unwrap();
    let gone = project(&conn, "abandoned");
    projects(&conn).trash(gone.uuid).unwrap();
    let errand = context(&conn, "@errand");
    LabelService::contexts(SqliteLabelRepository::try_new(&conn).unwrap())
        .trash(errand.uuid)
        .unwrap();

    for (project_uuid, context_uuid) in [
        (Some(done.uuid), None),
        (Some(gone.uuid), None),
        (None, Some(errand.uuid)),
    ] {
        let err = service
            .add(NewAction {
                project_uuid,
                context_uuid,
                ..NewAction::described("rejected")
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::InactiveReference(_)), "{err}");
    }

    let err = service
        .add(NewAction {
            project_uuid: Some(uuid::Uuid::new_v4()),
            ..NewAction::described("orphan")
        })
        .unwrap_err();
    match err {
        ServiceError::NotFound(item) => assert_eq!(item.kind, ItemKind::Project),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn move_to_refiles_and_clears_links() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);
    let garden = project(&conn, "garden");
    let home = context(&conn, "@home");
    let item = service.add(NewAction::described("rake leaves")).unwrap();

    let moved = service.move_to(item.uuid, Some(garden.uuid), Some(home.uuid)).unwrap();
    assert_eq!(moved.project_uuid, Some(garden.uuid));
    assert_eq!(moved.context_uuid, Some(home.uuid));

    let back = service.move_to(item.uuid, None, None).unwrap();
    assert!(back.is_in_inbox());

    let edited = service
        .edit(
            item.uuid,
            ActionPatch {
                notes: Some("before the rain".to_string()),
                due_at: Some(Some(42)),
                ..ActionPatch::default()
            },
        )
        .unwrap();
    assert_eq!(edited.notes, "before the rain");
    assert_eq!(edited.due_at, Some(42));
    assert_eq!(edited.description, "rake leaves");
}

#[test]
fn reopen_is_refused_inside_a_completed_project() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);
    let launch = project(&conn, "launch");
    let item = service
        .add(NewAction {
            project_uuid: Some(launch.uuid),
            ..NewAction::described("ship it")
        })
        .unwrap();

    let completed = service.complete(item.uuid).unwrap();
    assert!(completed.is_completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(service.reopen(item.uuid).unwrap().completed_at, None);

    projects(&conn).complete(launch.uuid).unwrap();
    let err = service.reopen(item.uuid).unwrap_err();
    assert!(matches!(err, ServiceError::InactiveReference(_)));
}

#[test]
fn restore_under_trashed_project_detaches_the_item() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);
    let garden = project(&conn, "garden");
    let kept = service
        .add(NewAction {
            project_uuid: Some(garden.uuid),
            ..NewAction::described("water plants")
        })
        .unwrap();

    projects(&conn).trash(garden.uuid).unwrap();
    assert!(service.get(kept.uuid).unwrap().is_none());

    let restored = service.restore(kept.uuid).unwrap();
    assert!(restored.is_active());
    assert_eq!(restored.project_uuid, None);
    assert_eq!(descriptions(service.inbox().unwrap()), vec!["water plants"]);
}

#[test]
fn restore_keeps_the_project_when_it_is_active() {
    let conn = open_db_in_memory().unwrap();
    let service = actions(&conn);
    let garden = project(&conn, "garden");
    let item = service
        .add(NewAction {
            project_uuid: Some(garden.uuid),
            ..NewAction::described("prune roses")
        })
        .unwrap();

    service.trash(item.uuid).unwrap();
    assert!(service.by_project(garden.uuid).unwrap().is_empty());
    let restored = service.restore(item.uuid).unwrap();
    assert_eq!(restored.project_uuid, Some(garden.uuid));

    let err = service.restore(uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
