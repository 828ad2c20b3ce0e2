use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use serde::Serialize;

use crate::parsers::domain::normalize_domain;

/// History database flavours the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chromium,
    Safari,
}

impl BrowserKind {
    pub fn label(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Safari => "safari",
        }
    }
}

/// Timestamp column value as stored by SQLite, before decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<ValueRef<'_>> for RawTimestamp {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => RawTimestamp::Null,
            ValueRef::Integer(i) => RawTimestamp::Integer(i),
            ValueRef::Real(f) => RawTimestamp::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                RawTimestamp::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// One row of the visit query, exactly as read from the database.
#[derive(Debug, Clone, Serialize)]
pub struct RawVisitRow {
    pub url: String,
    pub title: Option<String>,
    pub raw_timestamp: RawTimestamp,
}

/// A decoded visit: the raw row plus its normalized domain and absolute time.
#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub url: String,
    pub title: Option<String>,
    pub raw_timestamp: RawTimestamp,
    pub domain: String,
    pub visit_time: DateTime<Utc>,
}

impl Visit {
    /// Builds a visit that did not come from a database row. The domain is
    /// derived from `url`; the raw timestamp is left as `Null`.
    pub fn synthetic(url: &str, title: Option<&str>, visit_time: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            title: title.map(str::to_string),
            raw_timestamp: RawTimestamp::Null,
            domain: normalize_domain(url),
            visit_time,
        }
    }

    /// Title with surrounding whitespace removed, `None` when blank.
    pub fn title_text(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
