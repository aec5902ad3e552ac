//! Ranked keyword search against `search_index`.
//!
//! # Invariants
//! - Trashed entities never appear; completed ones do.
//! - Ties in `bm25` rank are broken by `updated_at DESC, item_uuid ASC`.

use crate::model::item::{ItemId, ItemKind};
use crate::search::{SearchError, SearchResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row};
use uuid::Uuid;

pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

const SNIPPET_OPEN: &str = "[";
const SNIPPET_CLOSE: &str = "]";
const SNIPPET_TOKENS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub kind: Option<ItemKind>,
    /// `0` yields no hits.
    pub limit: u32,
    /// Hand `text` to FTS5 as-is (`AND`, `OR`, prefixes, phrases). Off by
    /// default: plain input is quoted term by term and every term must
    /// match.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
            limit: DEFAULT_SEARCH_LIMIT,
            raw_fts_syntax: false,
        }
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// The FTS5 `MATCH` operand, or `None` for blank input.
    fn match_expression(&self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }
        if self.raw_fts_syntax {
            return Some(text.to_string());
        }
        let quoted: Vec<String> = text
            .split_whitespace()
            .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
            .collect();
        Some(quoted.join(" AND "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub item_uuid: ItemId,
    pub kind: ItemKind,
    pub title: String,
    /// Best-matching fragment with hits wrapped in `[` `]`.
    pub snippet: String,
}

/// Runs `query` on `conn`. Blank text and a zero limit return no hits
/// without touching SQLite.
pub fn search_all(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(expression) = query.match_expression() else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = format!(
        "SELECT item_uuid, kind, title,
                snippet(search_index, -1, '{SNIPPET_OPEN}', '{SNIPPET_CLOSE}', ' ... ', {SNIPPET_TOKENS}) AS snippet
         FROM search_index
         WHERE search_index MATCH ?
           AND is_deleted = 0"
    );
    let mut bind_values = vec![Value::Text(expression.clone())];
    if let Some(kind) = query.kind {
        sql.push_str(" AND kind = ?");
        bind_values.push(Value::Text(kind.as_str().to_string()));
    }
    sql.push_str(" ORDER BY bm25(search_index), updated_at DESC, item_uuid ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let classify = |err: rusqlite::Error| classify_error(err, &expression);
    let mut stmt = conn.prepare(&sql).map_err(classify)?;
    let mut rows = stmt.query(params_from_iter(bind_values)).map_err(classify)?;
    let mut hits = Vec::new();
    while let Some(row) = rows.next().map_err(classify)? {
        hits.push(hit_from_row(row)?);
    }
    Ok(hits)
}

fn hit_from_row(row: &Row<'_>) -> SearchResult<SearchHit> {
    let uuid_text: String = row.get("item_uuid")?;
    let kind_text: String = row.get("kind")?;
    Ok(SearchHit {
        item_uuid: Uuid::parse_str(&uuid_text)
            .map_err(|_| SearchError::InvalidData(format!("invalid uuid `{uuid_text}`")))?,
        kind: ItemKind::parse(&kind_text)
            .ok_or_else(|| SearchError::InvalidData(format!("invalid kind `{kind_text}`")))?,
        title: row.get("title")?,
        snippet: row.get("snippet")?,
    })
}

/// Interrupts become `Cancelled`; FTS5 parse failures become
/// `InvalidQuery`.
fn classify_error(err: rusqlite::Error, expression: &str) -> SearchError {
    let rusqlite::Error::SqliteFailure(failure, message) = &err else {
        return err.into();
    };
    if failure.code == ErrorCode::OperationInterrupted {
        return SearchError::Cancelled;
    }
    let rejected_syntax = message.as_deref().is_some_and(|text| {
        let text = text.to_lowercase();
        (text.contains("fts5") && text.contains("syntax"))
            || text.contains("malformed match expression")
            || text.contains("unterminated")
            || text.contains("no such column")
    });
    if rejected_syntax {
        return SearchError::InvalidQuery {
            query: expression.to_string(),
            message: err.to_string(),
        };
    }
    err.into()
}
