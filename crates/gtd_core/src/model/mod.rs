//! GTD domain model.
//!
//! # Responsibility
//! - Define the entities the organizer persists: contexts, categories,
//!   projects, action items and reference items.
//! - Provide lifecycle helpers for completion and soft-delete semantics.
//!
//! # Invariants
//! - Every entity is identified by a stable `ItemId`.
//! - Deletion is a soft-delete tombstone until the trash is emptied.

pub mod action_item;
pub mod item;
pub mod label;
pub mod project;
pub mod reference;
