//! Core domain logic for the GTD organizer.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod view;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{flush_logging, init_logging, logging_status, LogLevel, LoggingError};
pub use model::action_item::ActionItem;
pub use model::item::{ItemId, ItemKind, ItemRef, ValidationError};
pub use model::label::{Label, LabelKind};
pub use model::project::Project;
pub use model::reference::ReferenceItem;
pub use repo::{ParentState, RepoError, RepoResult};
pub use search::fts::{search_all, SearchHit, SearchQuery};
pub use search::{SearchError, SearchResult};
pub use search::index::rebuild_index;
pub use search::worker::{SearchOutcome, SearchWorker};
pub use service::{ServiceError, ServiceResult};
pub use view::{GroupedTree, ListChange, ObservableList, Outline, TreeChange};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
