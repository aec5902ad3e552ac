//! Plain-text rendering of core records.

use chrono::DateTime;
use gtd_core::repo::archive_repo::ArchiveEntry;
use gtd_core::repo::trash_repo::TrashEntry;
use gtd_core::view::outline::Outline;
use gtd_core::{ActionItem, Label, Project, ReferenceItem, SearchHit};

/// `YYYY-MM-DD` (UTC) for an epoch-ms timestamp.
fn date(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn check(done: bool) -> &'static str {
    if done {
        "[x]"
    } else {
        "[ ]"
    }
}

pub fn print_label(label: &Label) {
    let trashed = if label.is_active() { "" } else { " (trashed)" };
    if label.description.is_empty() {
        println!("{}  {}{trashed}", label.uuid, label.name);
    } else {
        println!(
            "{}  {}{trashed}  {}",
            label.uuid, label.name, label.description
        );
    }
}

pub fn print_project(project: &Project) {
    let due = project
        .due_at
        .map(|at| format!("  due {}", date(at)))
        .unwrap_or_default();
    println!(
        "{} {}  {}{due}",
        check(project.is_completed),
        project.uuid,
        project.name
    );
}

pub fn print_action(item: &ActionItem) {
    let due = item
        .due_at
        .map(|at| format!("  due {}", date(at)))
        .unwrap_or_default();
    println!(
        "{} {}  {}{due}",
        check(item.is_completed),
        item.uuid,
        item.description
    );
}

pub fn print_reference(item: &ReferenceItem) {
    let tags = if item.tags.is_empty() {
        String::new()
    } else {
        format!("  #{}", item.tags.join(" #"))
    };
    println!("{}  {}{tags}", item.uuid, item.title);
    if let Some(url) = item.url.as_deref() {
        println!("    {url}");
    }
    if let Some(preview) = item.preview_text.as_deref() {
        println!("    {preview}");
    }
}

pub fn print_trash_entry(entry: &TrashEntry) {
    println!(
        "{}  {:<14} {}  {}",
        date(entry.deleted_at),
        entry.item.kind,
        entry.item.id,
        entry.title
    );
}

pub fn print_archive_entry(entry: &ArchiveEntry) {
    println!(
        "{}  {:<11} {}  {}",
        date(entry.completed_at),
        entry.item.kind,
        entry.item.id,
        entry.title
    );
}

pub fn print_search_hit(hit: &SearchHit) {
    println!("{:<14} {}  {}", hit.kind, hit.item_uuid, hit.title);
    if !hit.snippet.is_empty() && hit.snippet != hit.title {
        println!("    {}", hit.snippet);
    }
}

pub fn print_outline(outline: &Outline) {
    let tree = outline.tree();
    for (index, group) in tree.groups().iter().enumerate() {
        let Some(leaves) = tree.leaves(index) else {
            continue;
        };
        if leaves.is_empty() && group.uuid().is_none() {
            continue;
        }
        println!("{} ({})", group.title(outline.grouping()), leaves.len());
        for item in leaves.iter() {
            print!("  ");
            print_action(item);
        }
    }
}
