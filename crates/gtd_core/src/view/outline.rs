//! GTD outline: open action items grouped by project or by context.
//!
//! # Invariants
//! - The `Unfiled` group is always present and always last.
//! - An item appears at most once, and only while it is open and not
//!   trashed.
//! - An item whose project/context has no group lands in `Unfiled`.

use crate::model::action_item::ActionItem;
use crate::model::item::ItemId;
use crate::view::observable::ListenerId;
use crate::view::tree::{GroupedTree, TreeChange};
use crate::view::ViewResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineGrouping {
    ByProject,
    ByContext,
}

impl OutlineGrouping {
    fn key(self, item: &ActionItem) -> Option<ItemId> {
        match self {
            Self::ByProject => item.project_uuid,
            Self::ByContext => item.context_uuid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineGroup {
    Project { uuid: ItemId, name: String },
    Context { uuid: ItemId, name: String },
    /// Items without a project (or context).
    Unfiled,
}

impl OutlineGroup {
    pub fn uuid(&self) -> Option<ItemId> {
        match self {
            Self::Project { uuid, .. } | Self::Context { uuid, .. } => Some(*uuid),
            Self::Unfiled => None,
        }
    }

    pub fn title(&self, grouping: OutlineGrouping) -> &str {
        match (self, grouping) {
            (Self::Project { name, .. } | Self::Context { name, .. }, _) => name,
            (Self::Unfiled, OutlineGrouping::ByProject) => "No project",
            (Self::Unfiled, OutlineGrouping::ByContext) => "Inbox",
        }
    }
}

pub struct Outline {
    grouping: OutlineGrouping,
    tree: GroupedTree<OutlineGroup, ActionItem>,
}

impl Outline {
    /// Distributes `items` over `groups` (kept in the given order) plus a
    /// trailing `Unfiled` group. Closed or trashed items are skipped.
    pub fn build(
        grouping: OutlineGrouping,
        groups: Vec<OutlineGroup>,
        items: Vec<ActionItem>,
    ) -> Self {
        let mut buckets: Vec<(OutlineGroup, Vec<ActionItem>)> = groups
            .into_iter()
            .filter(|group| *group != OutlineGroup::Unfiled)
            .map(|group| (group, Vec::new()))
            .collect();
        let mut unfiled = Vec::new();

        for item in items.into_iter().filter(is_listed) {
            let slot = grouping.key(&item).and_then(|key| {
                buckets
                    .iter()
                    .position(|(group, _)| group.uuid() == Some(key))
            });
            match slot {
                Some(index) => buckets[index].1.push(item),
                None => unfiled.push(item),
            }
        }
        buckets.push((OutlineGroup::Unfiled, unfiled));

        Self {
            grouping,
            tree: GroupedTree::from_groups(buckets),
        }
    }

    pub fn grouping(&self) -> OutlineGrouping {
        self.grouping
    }

    pub fn tree(&self) -> &GroupedTree<OutlineGroup, ActionItem> {
        &self.tree
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TreeChange) + 'static) -> ListenerId {
        self.tree.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.tree.unsubscribe(id)
    }

    /// Path `[group, leaf]` of one item.
    pub fn locate(&self, id: ItemId) -> Option<Vec<usize>> {
        self.tree.find_leaf(|item| item.uuid == id)
    }

    /// Applies the latest state of one item: inserts, updates in place,
    /// moves between groups, or removes it when closed or trashed.
    pub fn apply(&mut self, item: ActionItem) -> ViewResult<()> {
        if !is_listed(&item) {
            self.remove_item(item.uuid)?;
            return Ok(());
        }

        let target = self.group_for(&item);
        match self.locate(item.uuid).as_deref() {
            Some(&[group, leaf]) if group == target => {
                self.tree.set_leaf(group, leaf, item)?;
            }
            Some(&[group, leaf]) => {
                self.tree.remove_leaf(group, leaf)?;
                self.tree.push_leaf(target, item)?;
            }
            _ => {
                self.tree.push_leaf(target, item)?;
            }
        }
        Ok(())
    }

    /// Returns `false` when the item was not shown.
    pub fn remove_item(&mut self, id: ItemId) -> ViewResult<bool> {
        match self.locate(id).as_deref() {
            Some(&[group, leaf]) => {
                self.tree.remove_leaf(group, leaf)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Inserts a new group before `Unfiled`, or renames an existing one.
    pub fn apply_group(&mut self, group: OutlineGroup) -> ViewResult<()> {
        let Some(uuid) = group.uuid() else {
            return Ok(());
        };
        match self.tree.find_group(|existing| existing.uuid() == Some(uuid)) {
            Some(index) => {
                self.tree.set_group(index, group)?;
            }
            None => {
                let unfiled = self.unfiled_index();
                self.tree.insert_group(unfiled, group, Vec::new())?;
            }
        }
        Ok(())
    }

    /// Drops a group; its items move to `Unfiled`.
    pub fn remove_group(&mut self, uuid: ItemId) -> ViewResult<bool> {
        let Some(index) = self.tree.find_group(|group| group.uuid() == Some(uuid)) else {
            return Ok(false);
        };
        let (_, list, _) = self.tree.remove_group(index)?;
        let orphans = list.borrow_mut().take_all();
        let unfiled = self.unfiled_index();
        for item in orphans {
            self.tree.push_leaf(unfiled, item)?;
        }
        Ok(true)
    }

    fn group_for(&self, item: &ActionItem) -> usize {
        self.grouping
            .key(item)
            .and_then(|key| self.tree.find_group(|group| group.uuid() == Some(key)))
            .unwrap_or_else(|| self.unfiled_index())
    }

    fn unfiled_index(&self) -> usize {
        self.tree.group_count().saturating_sub(1)
    }
}

fn is_listed(item: &ActionItem) -> bool {
    item.is_active() && !item.is_completed
}

#[cfg(test)]
mod tests {
    use super::{Outline, OutlineGroup, OutlineGrouping};
    use crate::model::action_item::ActionItem;
    use crate::view::tree::{TreeChange, TreeChangeKind};
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    fn context(name: &str) -> OutlineGroup {
        OutlineGroup::Context {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn build_puts_unassigned_and_closed_items_in_place() {
        let phone = context("@phone");
        let phone_id = phone.uuid().unwrap();
        let call = ActionItem::new("call bank").with_context(phone_id);
        let loose = ActionItem::new("buy milk");
        let mut done = ActionItem::new("done already").with_context(phone_id);
        done.complete(5);

        let outline = Outline::build(
            OutlineGrouping::ByContext,
            vec![phone.clone()],
            vec![call.clone(), loose.clone(), done],
        );

        let tree = outline.tree();
        assert_eq!(tree.groups(), &[phone, OutlineGroup::Unfiled]);
        assert_eq!(&*tree.leaves(0).unwrap(), &[call]);
        assert_eq!(&*tree.leaves(1).unwrap(), &[loose]);
        assert_eq!(tree.groups()[1].title(outline.grouping()), "Inbox");
    }

    #[test]
    fn apply_moves_items_between_groups() {
        let home = context("@home");
        let work = context("@work");
        let mut item = ActionItem::new("fix sink").with_context(home.uuid().unwrap());
        let mut outline = Outline::build(
            OutlineGrouping::ByContext,
            vec![home, work.clone()],
            vec![item.clone()],
        );
        let seen = Rc::new(RefCell::new(Vec::<TreeChange>::new()));
        let sink = Rc::clone(&seen);
        outline.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        item.context_uuid = work.uuid();
        outline.apply(item.clone()).unwrap();
        assert_eq!(outline.locate(item.uuid), Some(vec![1, 0]));

        item.description = "fix kitchen sink".to_string();
        outline.apply(item.clone()).unwrap();
        item.complete(9);
        outline.apply(item.clone()).unwrap();
        assert_eq!(outline.locate(item.uuid), None);

        let kinds: Vec<_> = seen.borrow().iter().map(|change| change.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TreeChangeKind::NodesRemoved,
                TreeChangeKind::NodesInserted,
                TreeChangeKind::NodesChanged,
                TreeChangeKind::NodesRemoved,
            ]
        );
    }

    #[test]
    fn removing_a_group_unfiles_its_items() {
        let errands = context("@errands");
        let errands_id = errands.uuid().unwrap();
        let item = ActionItem::new("post letter").with_context(errands_id);
        let mut outline =
            Outline::build(OutlineGrouping::ByContext, vec![errands], vec![item.clone()]);

        assert!(outline.remove_group(errands_id).unwrap());
        assert_eq!(outline.tree().groups(), &[OutlineGroup::Unfiled]);
        assert_eq!(outline.locate(item.uuid), Some(vec![0, 0]));

        let garden = context("@garden");
        outline.apply_group(garden.clone()).unwrap();
        assert_eq!(outline.tree().groups(), &[garden, OutlineGroup::Unfiled]);
    }
}
