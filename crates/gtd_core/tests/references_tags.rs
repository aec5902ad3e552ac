use gtd_core::db::open_db_in_memory;
use gtd_core::repo::label_repo::SqliteLabelRepository;
use gtd_core::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use gtd_core::service::label_service::LabelService;
use gtd_core::service::reference_service::{NewReference, ReferencePatch, ReferenceService};
use gtd_core::{ReferenceItem, ServiceError};
use rusqlite::Connection;

fn service(conn: &Connection) -> ReferenceService<SqliteReferenceRepository<'_>> {
    ReferenceService::new(SqliteReferenceRepository::try_new(conn).unwrap())
}

fn titled(title: &str) -> NewReference {
    NewReference {
        title: title.to_string(),
        ..NewReference::default()
    }
}

fn titles(items: &[ReferenceItem]) -> Vec<&str> {
    items.iter().map(|item| item.title.as_str()).collect()
}

#[test]
fn add_derives_preview_and_url_from_body() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let item = service
        .add(NewReference {
            body: "## Recipe\nSee [the blog](https://example.com/soup) for **details**".to_string(),
            ..titled(" Soup ")
        })
        .unwrap();

    assert_eq!(item.title, "Soup");
    assert_eq!(item.url.as_deref(), Some("https://example.com/soup"));
    assert_eq!(
        item.preview_text.as_deref(),
        Some("Recipe See the blog for details")
    );
}

#[test]
fn explicit_url_wins_over_body_link() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let item = service
        .add(NewReference {
            body: "[mirror](https://mirror.example)".to_string(),
            url: Some(" https://origin.example ".to_string()),
            ..titled("manual")
        })
        .unwrap();
    assert_eq!(item.url.as_deref(), Some("https://origin.example"));

    let cleared = service
        .edit(
            item.uuid,
            ReferencePatch {
                url: Some(None),
                ..ReferencePatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.url, None);
    assert_eq!(cleared.body, "[mirror](https://mirror.example)");
}

#[test]
fn editing_body_recomputes_preview() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let item = service
        .add(NewReference {
            body: "first draft".to_string(),
            ..titled("notes")
        })
        .unwrap();

    let edited = service
        .edit(
            item.uuid,
            ReferencePatch {
                body: Some("> second *draft*".to_string()),
                ..ReferencePatch::default()
            },
        )
        .unwrap();
    assert_eq!(edited.preview_text.as_deref(), Some("second draft"));

    let emptied = service
        .edit(
            item.uuid,
            ReferencePatch {
                body: Some(String::new()),
                ..ReferencePatch::default()
            },
        )
        .unwrap();
    assert_eq!(emptied.preview_text, None);
}

#[test]
fn tags_are_normalized_and_replaced_atomically() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let item = service
        .add(NewReference {
            tags: vec!["Rust".to_string(), " rust ".to_string(), "Books".to_string()],
            ..titled("reading list")
        })
        .unwrap();
    assert_eq!(item.tags, vec!["books", "rust"]);

    let retagged = service
        .set_tags(item.uuid, vec!["Music".to_string()])
        .unwrap();
    assert_eq!(retagged.tags, vec!["music"]);

    let err = service
        .set_tags(item.uuid, vec!["ok".to_string(), "  ".to_string()])
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTag(_)));
    assert_eq!(service.get(item.uuid).unwrap().unwrap().tags, vec!["music"]);

    let tags = service.list_tags().unwrap();
    assert!(tags.contains(&"music".to_string()));
}

#[test]
fn blank_tag_on_add_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let err = service(&conn)
        .add(NewReference {
            tags: vec![String::new()],
            ..titled("untagged")
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTag(_)));
}

#[test]
fn list_filters_by_tag_and_category() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let work = LabelService::categories(SqliteLabelRepository::try_new(&conn).unwrap())
        .add("work", "")
        .unwrap();

    service
        .add(NewReference {
            tags: vec!["travel".to_string()],
            ..titled("passport scan")
        })
        .unwrap();
    service
        .add(NewReference {
            category_uuid: Some(work.uuid),
            tags: vec!["hr".to_string()],
            ..titled("benefits")
        })
        .unwrap();

    let by_tag = service
        .list(Some(" TRAVEL ".to_string()), None, None, 0)
        .unwrap();
    assert_eq!(titles(&by_tag.items), vec!["passport scan"]);

    let by_category = service.list(None, Some(work.uuid), None, 0).unwrap();
    assert_eq!(titles(&by_category.items), vec!["benefits"]);
}

#[test]
fn list_is_newest_first_with_applied_limit() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteReferenceRepository::try_new(&conn).unwrap();
    for (title, updated_at) in [("old", 1_000), ("newest", 3_000), ("middle", 2_000)] {
        let mut item = ReferenceItem::new(title);
        item.lifecycle.created_at = updated_at;
        item.lifecycle.updated_at = updated_at;
        repo.create_reference(&item).unwrap();
    }
    let service = ReferenceService::new(repo);

    let all = service.list(None, None, Some(0), 0).unwrap();
    assert_eq!(all.applied_limit, 20);
    assert_eq!(titles(&all.items), vec!["newest", "middle", "old"]);

    let page = service.list(None, None, Some(1), 1).unwrap();
    assert_eq!(page.applied_limit, 1);
    assert_eq!(titles(&page.items), vec!["middle"]);

    assert_eq!(service.list(None, None, Some(500), 0).unwrap().applied_limit, 100);
}

#[test]
fn trashed_references_are_hidden_until_restored() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let item = service.add(titled("warranty")).unwrap();

    service.trash(item.uuid).unwrap();
    assert!(service.get(item.uuid).unwrap().is_none());
    assert!(service.list(None, None, None, 0).unwrap().items.is_empty());
    let err = service
        .edit(item.uuid, ReferencePatch::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let restored = service.restore(item.uuid).unwrap();
    assert!(restored.is_active());
}

#[test]
fn edit_within_the_same_second_moves_item_to_front() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alpha = service.add(titled("alpha")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let beta = service.add(titled("beta")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));

    let edited = service
        .edit(
            alpha.uuid,
            ReferencePatch {
                title: Some("alpha edited".to_string()),
                ..ReferencePatch::default()
            },
        )
        .unwrap();

    assert!(edited.lifecycle.updated_at >= edited.lifecycle.created_at);
    assert!(edited.lifecycle.updated_at > beta.lifecycle.updated_at);
    let listed = service.list(None, None, None, 0).unwrap();
    assert_eq!(titles(&listed.items), vec!["alpha edited", "beta"]);
}

#[test]
fn lifecycle_noops_leave_updated_at_alone() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteReferenceRepository::try_new(&conn).unwrap();
    let mut older = ReferenceItem::new("older");
    older.lifecycle.created_at = 1_000;
    older.lifecycle.updated_at = 1_000;
    let mut newer = ReferenceItem::new("newer");
    newer.lifecycle.created_at = 2_000;
    newer.lifecycle.updated_at = 2_000;
    repo.create_reference(&older).unwrap();
    repo.create_reference(&newer).unwrap();

    repo.restore_reference(older.uuid).unwrap();
    let untouched = repo.get_reference(older.uuid, false).unwrap().unwrap();
    assert_eq!(untouched.lifecycle.updated_at, 1_000);

    repo.soft_delete_reference(newer.uuid, 5_000).unwrap();
    let trashed = repo.get_reference(newer.uuid, true).unwrap().unwrap();
    repo.soft_delete_reference(newer.uuid, 6_000).unwrap();
    let again = repo.get_reference(newer.uuid, true).unwrap().unwrap();
    assert_eq!(again.lifecycle.deleted_at, Some(5_000));
    assert_eq!(again.lifecycle.updated_at, trashed.lifecycle.updated_at);

    let service = ReferenceService::new(repo);
    let listed = service.list(None, None, None, 0).unwrap();
    assert_eq!(titles(&listed.items), vec!["older"]);

    let missing = service.restore(uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound(_)));
}
