//! Full-text search over every organizer entity.
//!
//! # Responsibility
//! - `fts`: ranked keyword queries against the FTS5 `search_index`.
//! - `index`: manual rebuild of that index.
//! - `worker`: background thread with cancel-and-restart semantics.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod fts;
pub mod index;
pub mod worker;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// Raw FTS5 input that SQLite refused to parse.
    InvalidQuery { query: String, message: String },
    /// A newer search superseded this one.
    Cancelled,
    WorkerStopped,
    TimedOut,
    /// The worker thread could not be started.
    Spawn(std::io::Error),
    Db(DbError),
    /// An index row with an unknown kind or malformed uuid.
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Cancelled => write!(f, "search cancelled"),
            Self::WorkerStopped => write!(f, "search worker is not running"),
            Self::TimedOut => write!(f, "search timed out"),
            Self::Spawn(err) => write!(f, "failed to start search worker: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
