//! Observable list: a vector that reports every mutation to subscribers.
//!
//! # Invariants
//! - Each successful mutation emits exactly one [`ListChange`], after the
//!   vector has been updated, and also returns it to the caller.
//! - Failed mutations (index out of bounds) change nothing and emit nothing.
//! - No-op mutations (clearing an empty list, extending with nothing)
//!   emit nothing.

use crate::view::{ViewError, ViewResult};
use std::cell::RefCell;
use std::rc::Rc;

/// One contiguous change to an [`ObservableList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    /// `count` items now sit at `index..index + count`.
    Inserted { index: usize, count: usize },
    /// `count` items that sat at `index..index + count` are gone.
    Removed { index: usize, count: usize },
    /// The item at `index` was replaced in place.
    Updated { index: usize },
    /// The whole content was replaced.
    Reset,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// List handle shared between its owner and the views bound to it.
pub type SharedList<T> = Rc<RefCell<ObservableList<T>>>;

/// Ordered listener set shared by lists and trees.
pub(crate) struct Listeners<E> {
    entries: Vec<(ListenerId, Listener<E>)>,
    next_id: u64,
}

impl<E> Listeners<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub(crate) fn add(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct ObservableList<T> {
    items: Vec<T>,
    listeners: Listeners<ListChange>,
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObservableList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Wraps existing items without emitting anything.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items,
            listeners: Listeners::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_shared(self) -> SharedList<T> {
        Rc::new(RefCell::new(self))
    }

    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ListChange) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Returns `false` when the id was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn push(&mut self, item: T) -> ListChange {
        self.items.push(item);
        self.emit(ListChange::Inserted {
            index: self.items.len() - 1,
            count: 1,
        })
    }

    pub fn insert(&mut self, index: usize, item: T) -> ViewResult<ListChange> {
        self.check_index(index, self.items.len() + 1)?;
        self.items.insert(index, item);
        Ok(self.emit(ListChange::Inserted { index, count: 1 }))
    }

    pub fn remove(&mut self, index: usize) -> ViewResult<(T, ListChange)> {
        self.check_index(index, self.items.len())?;
        let item = self.items.remove(index);
        Ok((item, self.emit(ListChange::Removed { index, count: 1 })))
    }

    /// Replaces one item in place and returns the previous value.
    pub fn set(&mut self, index: usize, item: T) -> ViewResult<(T, ListChange)> {
        self.check_index(index, self.items.len())?;
        let previous = std::mem::replace(&mut self.items[index], item);
        Ok((previous, self.emit(ListChange::Updated { index })))
    }

    /// Appends every item as one `Inserted` range.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> Option<ListChange> {
        let index = self.items.len();
        self.items.extend(items);
        let count = self.items.len() - index;
        if count == 0 {
            return None;
        }
        Some(self.emit(ListChange::Inserted { index, count }))
    }

    pub fn clear(&mut self) -> Option<ListChange> {
        let count = self.items.len();
        if count == 0 {
            return None;
        }
        self.items.clear();
        Some(self.emit(ListChange::Removed { index: 0, count }))
    }

    /// Moves every item out as one `Removed` range.
    pub fn take_all(&mut self) -> Vec<T> {
        let items = std::mem::take(&mut self.items);
        if !items.is_empty() {
            self.emit(ListChange::Removed {
                index: 0,
                count: items.len(),
            });
        }
        items
    }

    /// Swaps in a whole new content.
    pub fn replace_all(&mut self, items: Vec<T>) -> ListChange {
        self.items = items;
        self.emit(ListChange::Reset)
    }

    fn check_index(&self, index: usize, bound: usize) -> ViewResult<()> {
        if index >= bound {
            return Err(ViewError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    fn emit(&mut self, change: ListChange) -> ListChange {
        self.listeners.emit(&change);
        change
    }
}
