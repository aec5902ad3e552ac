use gtd_core::db::migrations::{apply_migrations, latest_version};
use gtd_core::db::open_db_in_memory;
use gtd_core::repo::action_repo::{ActionRepository, SqliteActionRepository};
use gtd_core::repo::label_repo::{LabelRepository, SqliteLabelRepository};
use gtd_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use gtd_core::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use gtd_core::search::index::indexed_row_count;
use gtd_core::{
    rebuild_index, search_all, ActionItem, ItemKind, Label, Project, ReferenceItem, SearchError,
    SearchQuery,
};
use rusqlite::Connection;
use std::collections::HashSet;

fn add_action(conn: &Connection, description: &str) -> ActionItem {
    let item = ActionItem::new(description);
    SqliteActionRepository::try_new(conn)
        .unwrap()
        .create_action(&item)
        .unwrap();
    item
}

#[test]
fn search_covers_every_kind() {
    let conn = open_db_in_memory().unwrap();
    let context = Label::context("@garage");
    let mut category = Label::category("hobbies");
    category.description = "garage workshop".to_string();
    let labels = SqliteLabelRepository::try_new(&conn).unwrap();
    labels.create_label(&context).unwrap();
    labels.create_label(&category).unwrap();

    let mut project = Project::new("build shelf");
    project.description = "for the garage".to_string();
    SqliteProjectRepository::try_new(&conn)
        .unwrap()
        .create_project(&project)
        .unwrap();

    let action = add_action(&conn, "sweep the garage");

    let mut reference = ReferenceItem::new("shelf plans");
    reference.url = Some("https://example.com/garage".to_string());
    SqliteReferenceRepository::try_new(&conn)
        .unwrap()
        .create_reference(&reference)
        .unwrap();

    let hits = search_all(&conn, &SearchQuery::new("garage")).unwrap();
    let found: HashSet<_> = hits.iter().map(|hit| (hit.kind, hit.item_uuid)).collect();
    assert_eq!(
        found,
        HashSet::from([
            (ItemKind::Context, context.uuid),
            (ItemKind::Category, category.uuid),
            (ItemKind::Project, project.uuid),
            (ItemKind::ActionItem, action.uuid),
            (ItemKind::ReferenceItem, reference.uuid),
        ])
    );
}

#[test]
fn search_reflects_updated_content() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteActionRepository::try_new(&conn).unwrap();
    let mut item = add_action(&conn, "alpha errand");

    item.description = "beta errand".to_string();
    repo.update_action(&item).unwrap();

    assert!(search_all(&conn, &SearchQuery::new("alpha")).unwrap().is_empty());
    let hits = search_all(&conn, &SearchQuery::new("beta")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_uuid, item.uuid);
    assert_eq!(hits[0].title, "beta errand");
    assert!(hits[0].snippet.contains("beta"));
}

#[test]
fn search_excludes_trashed_but_keeps_completed_items() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteActionRepository::try_new(&conn).unwrap();
    let trashed = add_action(&conn, "buy milk");
    repo.soft_delete_action(trashed.uuid, 10).unwrap();
    let mut done = add_action(&conn, "buy bread");
    done.complete(20);
    repo.update_action(&done).unwrap();

    let hits = search_all(&conn, &SearchQuery::new("buy")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_uuid, done.uuid);

    repo.restore_action(trashed.uuid).unwrap();
    assert_eq!(search_all(&conn, &SearchQuery::new("milk")).unwrap().len(), 1);
}

#[test]
fn search_can_filter_by_kind() {
    let conn = open_db_in_memory().unwrap();
    let project = Project::new("plan vacation");
    SqliteProjectRepository::try_new(&conn)
        .unwrap()
        .create_project(&project)
        .unwrap();
    let action = add_action(&conn, "plan meeting agenda");

    let hits = search_all(
        &conn,
        &SearchQuery::new("plan").with_kind(ItemKind::ActionItem),
    )
    .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_uuid, action.uuid);
}

#[test]
fn search_limit_is_applied() {
    let conn = open_db_in_memory().unwrap();
    let ids: HashSet<_> = ["token a", "token b", "token c"]
        .into_iter()
        .map(|description| add_action(&conn, description).uuid)
        .collect();

    let hits = search_all(&conn, &SearchQuery::new("token").with_limit(2)).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| ids.contains(&hit.item_uuid)));

    let none = search_all(&conn, &SearchQuery::new("token").with_limit(0)).unwrap();
    assert!(none.is_empty());
}

#[test]
fn all_terms_must_match() {
    let conn = open_db_in_memory().unwrap();
    add_action(&conn, "call dentist");
    let both = add_action(&conn, "call plumber about the sink");

    let hits = search_all(&conn, &SearchQuery::new("call sink")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_uuid, both.uuid);
}

#[test]
fn blank_query_returns_empty_results() {
    let conn = open_db_in_memory().unwrap();
    add_action(&conn, "anything");
    assert!(search_all(&conn, &SearchQuery::new("   ")).unwrap().is_empty());
}

#[test]
fn escaped_query_text_does_not_fail_on_common_symbols() {
    let conn = open_db_in_memory().unwrap();
    add_action(&conn, "alpha beta");

    for text in ["a:b", "(beta", "\"quoted", "beta*", "NOT"] {
        let result = search_all(&conn, &SearchQuery::new(text));
        assert!(result.is_ok(), "query `{text}` failed: {result:?}");
    }
}

#[test]
fn raw_fts_syntax_reports_invalid_query() {
    let conn = open_db_in_memory().unwrap();
    let mut query = SearchQuery::new("\"unterminated");
    query.raw_fts_syntax = true;

    let err = search_all(&conn, &query).unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery { .. }));
}

#[test]
fn raw_fts_syntax_supports_operators() {
    let conn = open_db_in_memory().unwrap();
    let dentist = add_action(&conn, "call dentist");
    let plumber = add_action(&conn, "call plumber");
    add_action(&conn, "email landlord");

    let mut query = SearchQuery::new("dentist OR plumber");
    query.raw_fts_syntax = true;
    let found: HashSet<_> = search_all(&conn, &query)
        .unwrap()
        .into_iter()
        .map(|hit| hit.item_uuid)
        .collect();
    assert_eq!(found, HashSet::from([dentist.uuid, plumber.uuid]));
}

#[test]
fn migration_backfills_rows_written_before_the_index_existed() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
        .unwrap();
    conn.execute_batch(
        "INSERT INTO action_items (uuid, description)
         VALUES ('11111111-2222-4333-8444-555555555555', 'legacy indexed errand');",
    )
    .unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();

    apply_migrations(&mut conn).unwrap();
    let current_version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(current_version, latest_version());

    let hits = search_all(&conn, &SearchQuery::new("legacy")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, ItemKind::ActionItem);
}

#[test]
fn rebuild_index_repairs_a_drifted_index() {
    let conn = open_db_in_memory().unwrap();
    add_action(&conn, "water ferns");
    let project = Project::new("balcony garden");
    SqliteProjectRepository::try_new(&conn)
        .unwrap()
        .create_project(&project)
        .unwrap();

    conn.execute_batch("DELETE FROM search_index;").unwrap();
    assert_eq!(indexed_row_count(&conn).unwrap(), 0);
    assert!(search_all(&conn, &SearchQuery::new("ferns")).unwrap().is_empty());

    assert_eq!(rebuild_index(&conn).unwrap(), 2);
    assert_eq!(indexed_row_count(&conn).unwrap(), 2);
    assert_eq!(search_all(&conn, &SearchQuery::new("ferns")).unwrap().len(), 1);
}

#[test]
fn equal_rank_hits_prefer_recent_updates_then_uuid() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteActionRepository::try_new(&conn).unwrap();
    let stamped = |description: &str, updated_at: i64| {
        let mut item = ActionItem::new(description);
        item.lifecycle.created_at = updated_at;
        item.lifecycle.updated_at = updated_at;
        repo.create_action(&item).unwrap();
        item
    };
    let strong = stamped("water water plants", 500);
    let older = stamped("water plants", 1_000);
    let newer = stamped("water plants", 2_000);
    let tied_one = stamped("water plants", 3_000);
    let tied_two = stamped("water plants", 3_000);
    let mut tied = [tied_one.uuid, tied_two.uuid];
    tied.sort_by_key(|id| id.to_string());

    let order = |conn: &Connection| -> Vec<_> {
        search_all(conn, &SearchQuery::new("water"))
            .unwrap()
            .into_iter()
            .map(|hit| hit.item_uuid)
            .collect()
    };
    assert_eq!(
        order(&conn),
        vec![strong.uuid, tied[0], tied[1], newer.uuid, older.uuid]
    );

    repo.update_action(&older).unwrap();
    assert_eq!(
        order(&conn),
        vec![strong.uuid, older.uuid, tied[0], tied[1], newer.uuid]
    );
}

#[test]
fn interrupted_search_is_reported_as_cancelled() {
    let conn = open_db_in_memory().unwrap();
    seed_bulk(&conn, 20_000);
    let interrupt = conn.get_interrupt_handle();
    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let keep_going = std::sync::Arc::clone(&running);
    let interrupter = std::thread::spawn(move || {
        while keep_going.load(std::sync::atomic::Ordering::SeqCst) {
            interrupt.interrupt();
            std::thread::yield_now();
        }
    });

    let mut query = SearchQuery::new("alpha OR bulk*").with_limit(20_000);
    query.raw_fts_syntax = true;
    let result = search_all(&conn, &query);
    running.store(false, std::sync::atomic::Ordering::SeqCst);
    interrupter.join().unwrap();

    assert!(matches!(result, Err(SearchError::Cancelled)));
}

/// Inserts `count` action items sharing the tokens `alpha` and `bulk<n>`.
fn seed_bulk(conn: &Connection, count: usize) {
    conn.execute_batch("BEGIN;").unwrap();
    let repo = SqliteActionRepository::try_new(conn).unwrap();
    for index in 0..count {
        let item = ActionItem::new(format!("alpha bulk{index} filler text"));
        repo.create_action(&item).unwrap();
    }
    conn.execute_batch("COMMIT;").unwrap();
}
