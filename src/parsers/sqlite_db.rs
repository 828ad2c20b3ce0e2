use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::debug;

use crate::parsers::browser::{BrowserKind, RawTimestamp, RawVisitRow};

#[derive(Debug, Error)]
pub enum HistoryDbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database does not contain the {browser} history schema (missing table {table})")]
    UnsupportedSchema {
        browser: &'static str,
        table: &'static str,
    },
    #[error("history has {rows} visits, more than the configured limit of {limit}")]
    TooManyRows { rows: u64, limit: u64 },
}

const CHROMIUM_TABLES: &[&str] = &["urls", "visits"];
const SAFARI_TABLES: &[&str] = &["history_items", "history_visits"];

const CHROMIUM_VISITS: &str = "SELECT urls.url, urls.title, visits.visit_time \
     FROM visits JOIN urls ON visits.url = urls.id \
     ORDER BY visits.visit_time";
const CHROMIUM_COUNT: &str = "SELECT COUNT(*) FROM visits JOIN urls ON visits.url = urls.id";

const SAFARI_VISITS: &str = "SELECT history_items.url, history_visits.title, history_visits.visit_time \
     FROM history_visits JOIN history_items ON history_visits.history_item = history_items.id \
     ORDER BY history_visits.visit_time";
const SAFARI_COUNT: &str = "SELECT COUNT(*) FROM history_visits \
     JOIN history_items ON history_visits.history_item = history_items.id";

/// Read every visit row from a history database of the given kind.
///
/// The database is opened read-only. `max_rows` is checked before any row is
/// materialized.
pub fn load_history(
    path: &Path,
    kind: BrowserKind,
    max_rows: Option<u64>,
) -> Result<Vec<RawVisitRow>, HistoryDbError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    load_history_from(&conn, kind, max_rows)
}

/// Same as [`load_history`] over an already open connection.
pub fn load_history_from(
    conn: &Connection,
    kind: BrowserKind,
    max_rows: Option<u64>,
) -> Result<Vec<RawVisitRow>, HistoryDbError> {
    let (tables, count_sql, visits_sql) = match kind {
        BrowserKind::Chromium => (CHROMIUM_TABLES, CHROMIUM_COUNT, CHROMIUM_VISITS),
        BrowserKind::Safari => (SAFARI_TABLES, SAFARI_COUNT, SAFARI_VISITS),
    };

    for table in tables {
        if !has_table(conn, table)? {
            return Err(HistoryDbError::UnsupportedSchema {
                browser: kind.label(),
                table: *table,
            });
        }
    }

    if let Some(limit) = max_rows {
        let rows: i64 = conn.query_row(count_sql, [], |row| row.get(0))?;
        let rows = rows.max(0) as u64;
        if rows > limit {
            return Err(HistoryDbError::TooManyRows { rows, limit });
        }
    }

    let mut stmt = conn.prepare(visits_sql)?;
    let rows = stmt.query_map([], |row| {
        let url = lossy_text(row.get_ref(0)?);
        let title = lossy_text(row.get_ref(1)?);
        let raw_timestamp = RawTimestamp::from(row.get_ref(2)?);
        Ok(RawVisitRow {
            url: url.unwrap_or_default(),
            title,
            raw_timestamp,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    debug!(browser = kind.label(), rows = out.len(), "loaded history rows");
    Ok(out)
}

/// Text view of a column regardless of its storage class. Blobs and invalid
/// UTF-8 decode lossily.
fn lossy_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn has_table(conn: &Connection, name: &str) -> Result<bool, HistoryDbError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
    let mut rows = stmt.query([name])?;
    Ok(rows.next()?.is_some())
}
