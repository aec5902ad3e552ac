use gtd_core::db::open_db_in_memory;
use gtd_core::repo::action_repo::SqliteActionRepository;
use gtd_core::repo::label_repo::SqliteLabelRepository;
use gtd_core::repo::project_repo::SqliteProjectRepository;
use gtd_core::service::action_service::{ActionService, NewAction};
use gtd_core::service::label_service::LabelService;
use gtd_core::service::outline_service::OutlineService;
use gtd_core::service::project_service::{NewProject, ProjectService};
use gtd_core::view::{Outline, OutlineGroup, OutlineGrouping, TreeChangeKind};
use rusqlite::Connection;
use std::cell::RefCell;
use std::rc::Rc;

fn build(conn: &Connection, grouping: OutlineGrouping) -> Outline {
    OutlineService::new(
        SqliteActionRepository::try_new(conn).unwrap(),
        SqliteProjectRepository::try_new(conn).unwrap(),
        SqliteLabelRepository::try_new(conn).unwrap(),
    )
    .build(grouping)
    .unwrap()
}

fn summary(outline: &Outline) -> Vec<(String, Vec<String>)> {
    let tree = outline.tree();
    tree.groups()
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let leaves = tree
                .leaves(index)
                .unwrap()
                .iter()
                .map(|item| item.description.clone())
                .collect();
            (group.title(outline.grouping()).to_string(), leaves)
        })
        .collect()
}

fn group(title: &str, leaves: &[&str]) -> (String, Vec<String>) {
    (
        title.to_string(),
        leaves.iter().map(|leaf| leaf.to_string()).collect(),
    )
}

fn seed(conn: &Connection) {
    let projects = ProjectService::new(SqliteProjectRepository::try_new(conn).unwrap());
    let contexts = LabelService::contexts(SqliteLabelRepository::try_new(conn).unwrap());
    let actions = ActionService::new(SqliteActionRepository::try_new(conn).unwrap());

    let kitchen = projects.add(NewProject::named("kitchen")).unwrap();
    let attic = projects.add(NewProject::named("attic")).unwrap();
    let finished = projects.add(NewProject::named("finished")).unwrap();
    projects.complete(finished.uuid).unwrap();
    let phone = contexts.add("@phone", "").unwrap();

    for (description, project, context, due_at) in [
        ("order tiles", Some(kitchen.uuid), Some(phone.uuid), Some(2_000)),
        ("measure counter", Some(kitchen.uuid), None, Some(1_000)),
        ("clear boxes", Some(attic.uuid), None, None),
        ("call bank", None, Some(phone.uuid), Some(3_000)),
        ("someday idea", None, None, None),
    ] {
        actions
            .add(NewAction {
                project_uuid: project,
                context_uuid: context,
                due_at,
                ..NewAction::described(description)
            })
            .unwrap();
    }
    let done = actions.add(NewAction::described("already done")).unwrap();
    actions.complete(done.uuid).unwrap();
}

#[test]
fn outline_groups_open_items_by_project() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let outline = build(&conn, OutlineGrouping::ByProject);
    assert_eq!(
        summary(&outline),
        vec![
            group("attic", &["clear boxes"]),
            group("kitchen", &["measure counter", "order tiles"]),
            group("No project", &["call bank", "someday idea"]),
        ]
    );
}

#[test]
fn outline_groups_open_items_by_context() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let outline = build(&conn, OutlineGrouping::ByContext);
    let groups = summary(&outline);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0], group("@phone", &["order tiles", "call bank"]));
    assert_eq!(groups[1].0, "Inbox");
    assert_eq!(groups[1].1.len(), 3);
    assert_eq!(
        outline.tree().groups().last(),
        Some(&OutlineGroup::Unfiled)
    );
}

#[test]
fn outline_follows_service_writes() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::try_new(&conn).unwrap());
    let actions = ActionService::new(SqliteActionRepository::try_new(&conn).unwrap());
    let garden = projects.add(NewProject::named("garden")).unwrap();
    let item = actions.add(NewAction::described("buy seeds")).unwrap();

    let mut outline = build(&conn, OutlineGrouping::ByProject);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    outline.subscribe(move |change| sink.borrow_mut().push(change.kind));
    assert_eq!(outline.locate(item.uuid), Some(vec![1, 0]));

    let moved = actions.move_to(item.uuid, Some(garden.uuid), None).unwrap();
    outline.apply(moved).unwrap();
    assert_eq!(outline.locate(item.uuid), Some(vec![0, 0]));

    let done = actions.complete(item.uuid).unwrap();
    outline.apply(done).unwrap();
    assert_eq!(outline.locate(item.uuid), None);
    assert_eq!(outline.tree().leaf_count(), 0);

    assert_eq!(
        *seen.borrow(),
        vec![
            TreeChangeKind::NodesRemoved,
            TreeChangeKind::NodesInserted,
            TreeChangeKind::NodesRemoved,
        ]
    );
}
