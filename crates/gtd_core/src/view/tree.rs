//! Two-level tree model adapter: root → groups → leaves.
//!
//! Each group's leaves live in a [`SharedList`] the tree is bound to
//! through a subscription. Every change of a bound list, whether made
//! through the tree or directly by whoever else holds the handle, is
//! translated into a [`TreeChange`] addressed by the group path and
//! delivered to tree listeners.
//!
//! # Invariants
//! - `groups.len() == children.len()` at all times.
//! - Paths: `[]` is the root, `[g]` is group `g`, `[g, l]` is leaf `l`
//!   of group `g`.
//! - A `TreeChange` always names the parent path and the child indices as
//!   they are after an insert or were before a removal.
//! - A bound list reports under the group's current index; inserting or
//!   removing groups re-keys every binding after it.
//! - A group's list is unbound once the group leaves the tree.

use crate::view::observable::{ListChange, ListenerId, Listeners, ObservableList, SharedList};
use crate::view::{ViewError, ViewResult};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChangeKind {
    NodesInserted,
    NodesRemoved,
    NodesChanged,
    /// Everything below `path` must be reloaded.
    StructureChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub kind: TreeChangeKind,
    /// Path of the parent whose children changed.
    pub path: Vec<usize>,
    /// Affected child indices, ascending. Empty for `StructureChanged`.
    pub indices: Vec<usize>,
}

impl TreeChange {
    /// Translates one child-list change under `parent_path`.
    pub fn from_list_change(parent_path: &[usize], change: &ListChange) -> Self {
        let (kind, indices) = match *change {
            ListChange::Inserted { index, count } => {
                (TreeChangeKind::NodesInserted, (index..index + count).collect())
            }
            ListChange::Removed { index, count } => {
                (TreeChangeKind::NodesRemoved, (index..index + count).collect())
            }
            ListChange::Updated { index } => (TreeChangeKind::NodesChanged, vec![index]),
            ListChange::Reset => (TreeChangeKind::StructureChanged, Vec::new()),
        };
        Self {
            kind,
            path: parent_path.to_vec(),
            indices,
        }
    }
}

/// Borrowed view of one node.
#[derive(Debug)]
pub enum TreeNode<'a, G, L> {
    Root,
    Group(&'a G),
    Leaf(Ref<'a, L>),
}

type TreeListeners = Rc<RefCell<Listeners<TreeChange>>>;

/// Subscription tying one child list to its group slot.
struct ChildBinding<L> {
    list: SharedList<L>,
    slot: Rc<Cell<usize>>,
    listener: ListenerId,
}

impl<L> Drop for ChildBinding<L> {
    fn drop(&mut self) {
        if let Ok(mut list) = self.list.try_borrow_mut() {
            list.unsubscribe(self.listener);
        }
    }
}

pub struct GroupedTree<G, L> {
    groups: ObservableList<G>,
    children: Vec<ChildBinding<L>>,
    listeners: TreeListeners,
}

impl<G, L> Default for GroupedTree<G, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, L> GroupedTree<G, L> {
    pub fn new() -> Self {
        Self {
            groups: ObservableList::new(),
            children: Vec::new(),
            listeners: Rc::new(RefCell::new(Listeners::new())),
        }
    }

    /// Builds a populated tree without emitting anything.
    pub fn from_groups(groups: Vec<(G, Vec<L>)>) -> Self {
        let mut tree = Self::new();
        tree.load(groups);
        tree
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TreeChange) + 'static) -> ListenerId {
        self.listeners.borrow_mut().add(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, group: usize) -> Option<&G> {
        self.groups.get(group)
    }

    pub fn groups(&self) -> &[G] {
        self.groups.as_slice()
    }

    /// Handle to the list backing one group. Mutating it directly is
    /// reported to tree listeners like a tree mutation.
    pub fn child_list(&self, group: usize) -> Option<SharedList<L>> {
        self.children
            .get(group)
            .map(|binding| Rc::clone(&binding.list))
    }

    pub fn leaves(&self, group: usize) -> Option<Ref<'_, [L]>> {
        self.children
            .get(group)
            .map(|binding| Ref::map(binding.list.borrow(), ObservableList::as_slice))
    }

    pub fn leaf(&self, group: usize, leaf: usize) -> Option<Ref<'_, L>> {
        let binding = self.children.get(group)?;
        Ref::filter_map(binding.list.borrow(), |list| list.get(leaf)).ok()
    }

    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|binding| binding.list.borrow().len())
            .sum()
    }

    /// Number of children of the node at `path`.
    pub fn child_count(&self, path: &[usize]) -> ViewResult<usize> {
        match path {
            [] => Ok(self.groups.len()),
            [group] => self
                .children
                .get(*group)
                .map(|binding| binding.list.borrow().len())
                .ok_or_else(|| ViewError::InvalidPath(path.to_vec())),
            [group, leaf] => self
                .leaf(*group, *leaf)
                .map(|_| 0)
                .ok_or_else(|| ViewError::InvalidPath(path.to_vec())),
            _ => Err(ViewError::InvalidPath(path.to_vec())),
        }
    }

    pub fn node_at(&self, path: &[usize]) -> ViewResult<TreeNode<'_, G, L>> {
        let node = match path {
            [] => Some(TreeNode::Root),
            [group] => self.group(*group).map(TreeNode::Group),
            [group, leaf] => self.leaf(*group, *leaf).map(TreeNode::Leaf),
            _ => None,
        };
        node.ok_or_else(|| ViewError::InvalidPath(path.to_vec()))
    }

    pub fn find_group(&self, predicate: impl FnMut(&G) -> bool) -> Option<usize> {
        self.groups.position(predicate)
    }

    /// Path `[group, leaf]` of the first leaf matching `predicate`.
    pub fn find_leaf(&self, mut predicate: impl FnMut(&L) -> bool) -> Option<Vec<usize>> {
        self.children.iter().enumerate().find_map(|(group, binding)| {
            binding
                .list
                .borrow()
                .position(&mut predicate)
                .map(|leaf| vec![group, leaf])
        })
    }

    pub fn push_group(&mut self, group: G, leaves: Vec<L>) -> TreeChange {
        let binding = self.bind(
            self.children.len(),
            ObservableList::from_vec(leaves).into_shared(),
        );
        self.children.push(binding);
        let change = self.groups.push(group);
        self.emit(&[], &change)
    }

    pub fn insert_group(&mut self, index: usize, group: G, leaves: Vec<L>) -> ViewResult<TreeChange> {
        self.insert_bound_group(index, group, ObservableList::from_vec(leaves).into_shared())
    }

    /// Inserts a group backed by an existing list. The owner keeps its
    /// handle and may keep mutating the list.
    pub fn insert_bound_group(
        &mut self,
        index: usize,
        group: G,
        list: SharedList<L>,
    ) -> ViewResult<TreeChange> {
        if list.try_borrow_mut().is_err() {
            return Err(ViewError::ListBorrowed);
        }
        let change = self.groups.insert(index, group)?;
        let binding = self.bind(index, list);
        self.children.insert(index, binding);
        self.rekey();
        Ok(self.emit(&[], &change))
    }

    /// Removes a group and unbinds its list, returning the list handle.
    pub fn remove_group(&mut self, index: usize) -> ViewResult<(G, SharedList<L>, TreeChange)> {
        let (group, change) = self.groups.remove(index)?;
        let binding = self.children.remove(index);
        let list = Rc::clone(&binding.list);
        drop(binding);
        self.rekey();
        Ok((group, list, self.emit(&[], &change)))
    }

    pub fn set_group(&mut self, index: usize, group: G) -> ViewResult<(G, TreeChange)> {
        let (previous, change) = self.groups.set(index, group)?;
        Ok((previous, self.emit(&[], &change)))
    }

    pub fn push_leaf(&mut self, group: usize, leaf: L) -> ViewResult<TreeChange> {
        let change = self.list_mut(group)?.push(leaf);
        Ok(TreeChange::from_list_change(&[group], &change))
    }

    pub fn insert_leaf(&mut self, group: usize, index: usize, leaf: L) -> ViewResult<TreeChange> {
        let change = self.list_mut(group)?.insert(index, leaf)?;
        Ok(TreeChange::from_list_change(&[group], &change))
    }

    pub fn remove_leaf(&mut self, group: usize, index: usize) -> ViewResult<(L, TreeChange)> {
        let (leaf, change) = self.list_mut(group)?.remove(index)?;
        Ok((leaf, TreeChange::from_list_change(&[group], &change)))
    }

    pub fn set_leaf(&mut self, group: usize, index: usize, leaf: L) -> ViewResult<(L, TreeChange)> {
        let (previous, change) = self.list_mut(group)?.set(index, leaf)?;
        Ok((previous, TreeChange::from_list_change(&[group], &change)))
    }

    /// Replaces the whole tree and emits one root `StructureChanged`.
    pub fn reload(&mut self, groups: Vec<(G, Vec<L>)>) -> TreeChange {
        self.load(groups);
        self.emit(&[], &ListChange::Reset)
    }

    fn load(&mut self, groups: Vec<(G, Vec<L>)>) {
        let (heads, children): (Vec<G>, Vec<Vec<L>>) = groups.into_iter().unzip();
        self.groups = ObservableList::from_vec(heads);
        self.children = children
            .into_iter()
            .enumerate()
            .map(|(index, leaves)| {
                self.bind(index, ObservableList::from_vec(leaves).into_shared())
            })
            .collect();
    }

    /// Subscribes to `list` so its changes reach tree listeners under the
    /// slot's current group index.
    fn bind(&self, index: usize, list: SharedList<L>) -> ChildBinding<L> {
        let slot = Rc::new(Cell::new(index));
        let forward_slot = Rc::clone(&slot);
        let listeners = Rc::clone(&self.listeners);
        let listener = list.borrow_mut().subscribe(move |change| {
            let tree_change = TreeChange::from_list_change(&[forward_slot.get()], change);
            listeners.borrow_mut().emit(&tree_change);
        });
        ChildBinding {
            list,
            slot,
            listener,
        }
    }

    fn rekey(&self) {
        for (index, binding) in self.children.iter().enumerate() {
            binding.slot.set(index);
        }
    }

    fn list_mut(&self, group: usize) -> ViewResult<RefMut<'_, ObservableList<L>>> {
        let binding = self.children.get(group).ok_or(ViewError::IndexOutOfBounds {
            index: group,
            len: self.children.len(),
        })?;
        binding
            .list
            .try_borrow_mut()
            .map_err(|_| ViewError::ListBorrowed)
    }

    fn emit(&self, parent_path: &[usize], change: &ListChange) -> TreeChange {
        let tree_change = TreeChange::from_list_change(parent_path, change);
        self.listeners.borrow_mut().emit(&tree_change);
        tree_change
    }
}
