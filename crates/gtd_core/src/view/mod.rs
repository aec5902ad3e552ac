//! UI-agnostic view models.
//!
//! # Responsibility
//! - Hold in-memory lists and trees a front end binds to.
//! - Report every structural change as an event so a front end can update
//!   incrementally instead of reloading.
//!
//! # Invariants
//! - Views never touch storage; services feed them.
//! - Listeners run synchronously on the mutating thread, after the change
//!   is applied. They must not borrow the list that is notifying them.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod observable;
pub mod outline;
pub mod tree;

pub use observable::{ListChange, ListenerId, ObservableList, SharedList};
pub use outline::{Outline, OutlineGroup, OutlineGrouping};
pub use tree::{GroupedTree, TreeChange, TreeChangeKind, TreeNode};

pub type ViewResult<T> = Result<T, ViewError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    IndexOutOfBounds { index: usize, len: usize },
    /// Path does not name a node of the expected depth.
    InvalidPath(Vec<usize>),
    /// A bound list is borrowed elsewhere while the tree mutates it.
    ListBorrowed,
}

impl Display for ViewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::InvalidPath(path) => write!(f, "invalid tree path {path:?}"),
            Self::ListBorrowed => write!(f, "bound list is already borrowed"),
        }
    }
}

impl Error for ViewError {}
