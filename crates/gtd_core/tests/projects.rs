use gtd_core::db::open_db_in_memory;
use gtd_core::repo::action_repo::{ActionRepository, SqliteActionRepository};
use gtd_core::repo::label_repo::SqliteLabelRepository;
use gtd_core::repo::project_repo::{ProjectListQuery, ProjectRepository, SqliteProjectRepository};
use gtd_core::service::action_service::{ActionService, NewAction};
use gtd_core::service::label_service::LabelService;
use gtd_core::service::project_service::{NewProject, ProjectPatch, ProjectService};
use gtd_core::{ActionItem, ItemKind, Project, ServiceError};
use rusqlite::Connection;

fn projects(conn: &Connection) -> ProjectService<SqliteProjectRepository<'_>> {
    ProjectService::new(SqliteProjectRepository::try_new(conn).unwrap())
}

fn actions(conn: &Connection) -> ActionService<SqliteActionRepository<'_>> {
    ActionService::new(SqliteActionRepository::try_new(conn).unwrap())
}

fn action_in(conn: &Connection, project: &Project, description: &str) -> ActionItem {
    actions(conn)
        .add(NewAction {
            project_uuid: Some(project.uuid),
            ..NewAction::described(description)
        })
        .unwrap()
}

fn stored_action(conn: &Connection, item: &ActionItem) -> ActionItem {
    SqliteActionRepository::try_new(conn)
        .unwrap()
        .get_action(item.uuid, true)
        .unwrap()
        .unwrap()
}

#[test]
fn add_edit_and_list_projects() {
    let conn = open_db_in_memory().unwrap();
    let service = projects(&conn);

    let garden = service.add(NewProject::named(" Garden ")).unwrap();
    assert_eq!(garden.name, "Garden");
    service.add(NewProject::named("attic")).unwrap();

    let edited = service
        .edit(
            garden.uuid,
            ProjectPatch {
                description: Some("plant tomatoes".to_string()),
                due_at: Some(Some(1_800_000_000_000)),
                ..ProjectPatch::default()
            },
        )
        .unwrap();
    assert_eq!(edited.description, "plant tomatoes");
    assert_eq!(edited.due_at, Some(1_800_000_000_000));

    let names: Vec<_> = service
        .list_open()
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["attic", "Garden"]);
    assert_eq!(service.find("GARDEN").unwrap().unwrap().uuid, garden.uuid);
}

#[test]
fn category_must_be_active() {
    let conn = open_db_in_memory().unwrap();
    let categories = LabelService::categories(SqliteLabelRepository::try_new(&conn).unwrap());
    let home = categories.add("home", "").unwrap();
    let service = projects(&conn);

    let project = service
        .add(NewProject {
            category_uuid: Some(home.uuid),
            ..NewProject::named("paint fence")
        })
        .unwrap();
    assert_eq!(project.category_uuid, Some(home.uuid));
    let filtered = service
        .list(&ProjectListQuery {
            category_uuid: Some(home.uuid),
            ..ProjectListQuery::default()
        })
        .unwrap();
    assert_eq!(filtered.len(), 1);

    categories.trash(home.uuid).unwrap();
    let err = service
        .add(NewProject {
            category_uuid: Some(home.uuid),
            ..NewProject::named("fix roof")
        })
        .unwrap_err();
    match err {
        ServiceError::InactiveReference(item) => assert_eq!(item.kind, ItemKind::Category),
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .add(NewProject {
            category_uuid: Some(uuid::Uuid::new_v4()),
            ..NewProject::named("ghost")
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn trash_cascades_and_restore_reverses_only_that_cascade() {
    let conn = open_db_in_memory().unwrap();
    let service = projects(&conn);
    let project = service.add(NewProject::named("move house")).unwrap();
    let boxes = action_in(&conn, &project, "buy boxes");
    let movers = action_in(&conn, &project, "book movers");
    let early = action_in(&conn, &project, "cancel internet");

    SqliteActionRepository::try_new(&conn)
        .unwrap()
        .soft_delete_action(early.uuid, 1)
        .unwrap();

    let trashed = service.trash(project.uuid).unwrap();
    assert_eq!(trashed.action_items, 2);
    let deleted_at = trashed.project.lifecycle.deleted_at.unwrap();
    assert_eq!(stored_action(&conn, &boxes).lifecycle.deleted_at, Some(deleted_at));
    assert_eq!(stored_action(&conn, &movers).lifecycle.deleted_at, Some(deleted_at));
    assert!(service.get(project.uuid).unwrap().is_none());

    let restored = service.restore(project.uuid).unwrap();
    assert_eq!(restored.action_items, 2);
    assert!(restored.project.is_active());
    assert!(stored_action(&conn, &boxes).is_active());
    assert!(stored_action(&conn, &movers).is_active());

    let still_trashed = stored_action(&conn, &early);
    assert!(!still_trashed.is_active());
    assert_eq!(still_trashed.lifecycle.deleted_at, Some(1));
}

#[test]
fn trashing_twice_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let service = projects(&conn);
    let project = service.add(NewProject::named("taxes")).unwrap();
    action_in(&conn, &project, "collect receipts");

    assert_eq!(service.trash(project.uuid).unwrap().action_items, 1);
    assert_eq!(service.trash(project.uuid).unwrap().action_items, 0);
}

#[test]
fn complete_cascades_and_reopen_reverses_only_that_cascade() {
    let conn = open_db_in_memory().unwrap();
    let service = projects(&conn);
    let project = service.add(NewProject::named("launch blog")).unwrap();
    let write = action_in(&conn, &project, "write first post");
    let domain = action_in(&conn, &project, "register domain");
    let repo = SqliteActionRepository::try_new(&conn).unwrap();
    let mut done_earlier = stored_action(&conn, &domain);
    done_earlier.complete(5);
    repo.update_action(&done_earlier).unwrap();

    let completed = service.complete(project.uuid).unwrap();
    assert_eq!(completed.action_items, 1);
    assert!(completed.project.is_completed);
    assert_eq!(
        stored_action(&conn, &write).completed_at,
        completed.project.completed_at
    );

    let reopened = service.reopen(project.uuid).unwrap();
    assert_eq!(reopened.action_items, 1);
    assert!(!reopened.project.is_completed);
    assert!(!stored_action(&conn, &write).is_completed);

    let domain = stored_action(&conn, &domain);
    assert!(domain.is_completed);
    assert_eq!(domain.completed_at, Some(5));
}

#[test]
fn completing_a_trashed_project_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = projects(&conn);
    let project = service.add(NewProject::named("old plan")).unwrap();
    service.trash(project.uuid).unwrap();

    let err = service.complete(project.uuid).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn repository_rejects_invalid_completion_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let mut project = Project::new("broken");
    project.is_completed = true;

    assert!(repo.create_project(&project).is_err());
    assert!(repo
        .list_projects(&ProjectListQuery::default())
        .unwrap()
        .is_empty());
}
