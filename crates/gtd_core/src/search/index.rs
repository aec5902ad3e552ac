//! Search index maintenance.
//!
//! Triggers keep `search_index` in sync on every write; `rebuild_index` is
//! the manual repair path (`gtd reindex`) for an index that drifted, e.g.
//! after rows were edited with an external SQLite tool.

use crate::db::migrations::SEARCH_BACKFILL_SQL;
use crate::search::SearchResult;
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Drops every index row and repopulates from the entity tables.
///
/// Returns the number of indexed rows.
pub fn rebuild_index(conn: &Connection) -> SearchResult<usize> {
    let started_at = Instant::now();
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM search_index;", [])?;
    tx.execute_batch(SEARCH_BACKFILL_SQL)?;
    let indexed: i64 = tx.query_row("SELECT COUNT(*) FROM search_index;", [], |row| row.get(0))?;
    tx.commit()?;

    info!(
        "event=search_reindex module=search status=ok rows={} duration_ms={}",
        indexed,
        started_at.elapsed().as_millis()
    );
    Ok(indexed as usize)
}

/// Number of rows currently in the index, deleted entities included.
pub fn indexed_row_count(conn: &Connection) -> SearchResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM search_index;", [], |row| row.get(0))?;
    Ok(count as usize)
}
