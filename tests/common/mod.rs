//! Shared fixtures for history integration tests.
//!
//! Builds minimal Chromium and Safari history databases with rusqlite so the
//! tests exercise the same queries as real files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use rusqlite::types::Value;

use history_sessions::metadata::{self, MetadataBackendKind, ReportLimits, RunContext, RunSummary};
use history_sessions::parsers::browser::BrowserKind;
use history_sessions::parsers::sqlite_db;
use history_sessions::parsers::time::{COCOA_UNIX_OFFSET_SECS, WEBKIT_UNIX_OFFSET_SECS};
use history_sessions::pipeline::{self, AnalysisOptions, AnalysisReport};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

pub fn chromium_micros(at: DateTime<Utc>) -> i64 {
    (at.timestamp() + WEBKIT_UNIX_OFFSET_SECS) * 1_000_000
}

pub fn safari_seconds(at: DateTime<Utc>) -> f64 {
    (at.timestamp() - COCOA_UNIX_OFFSET_SECS) as f64
}

/// One Chromium visit row; `visit_time` is stored as given.
pub struct ChromiumVisit<'a> {
    pub url: &'a str,
    pub title: Option<&'a str>,
    pub visit_time: Value,
}

pub fn chromium_visit<'a>(url: &'a str, title: Option<&'a str>, at: DateTime<Utc>) -> ChromiumVisit<'a> {
    ChromiumVisit {
        url,
        title,
        visit_time: Value::Integer(chromium_micros(at)),
    }
}

pub fn write_chromium_history(dir: &Path, visits: &[ChromiumVisit<'_>]) -> PathBuf {
    let path = dir.join("History");
    let conn = Connection::open(&path).expect("conn");
    conn.execute_batch(
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url LONGVARCHAR, title LONGVARCHAR, \
             visit_count INTEGER DEFAULT 0, typed_count INTEGER DEFAULT 0, last_visit_time INTEGER);
         CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER NOT NULL, visit_time INTEGER, \
             from_visit INTEGER, transition INTEGER DEFAULT 0);",
    )
    .expect("schema");
    for (idx, visit) in visits.iter().enumerate() {
        let id = idx as i64 + 1;
        conn.execute(
            "INSERT INTO urls (id, url, title) VALUES (?1, ?2, ?3)",
            (id, visit.url, visit.title),
        )
        .expect("insert url");
        conn.execute(
            "INSERT INTO visits (url, visit_time, transition) VALUES (?1, ?2, 805306368)",
            (id, &visit.visit_time),
        )
        .expect("insert visit");
    }
    path
}

pub fn write_safari_history(dir: &Path, visits: &[(&str, Option<&str>, f64)]) -> PathBuf {
    let path = dir.join("History.db");
    let conn = Connection::open(&path).expect("conn");
    conn.execute_batch(
        "CREATE TABLE history_items (id INTEGER PRIMARY KEY, url TEXT NOT NULL UNIQUE, \
             domain_expansion TEXT, visit_count INTEGER NOT NULL);
         CREATE TABLE history_visits (id INTEGER PRIMARY KEY, history_item INTEGER NOT NULL, \
             visit_time REAL NOT NULL, title TEXT, load_successful BOOLEAN DEFAULT 1);",
    )
    .expect("schema");
    for (url, title, seconds) in visits {
        conn.execute(
            "INSERT OR IGNORE INTO history_items (url, visit_count) VALUES (?1, 0)",
            (url,),
        )
        .expect("insert item");
        let item: i64 = conn
            .query_row("SELECT id FROM history_items WHERE url = ?1", (url,), |row| row.get(0))
            .expect("item id");
        conn.execute(
            "INSERT INTO history_visits (history_item, visit_time, title) VALUES (?1, ?2, ?3)",
            (item, seconds, title),
        )
        .expect("insert visit");
    }
    path
}

pub fn analyze_file(path: &Path, kind: BrowserKind, opts: &AnalysisOptions) -> AnalysisReport {
    let rows = sqlite_db::load_history(path, kind, None).expect("load history");
    pipeline::analyze(rows, kind, opts).expect("analyze")
}

/// Analyze `path` with default options and write every report stream under
/// `out_dir/metadata`.
pub fn run_to_dir(
    path: &Path,
    kind: BrowserKind,
    backend: MetadataBackendKind,
    out_dir: &Path,
) -> AnalysisReport {
    let opts = AnalysisOptions::default();
    let report = analyze_file(path, kind, &opts);
    let ctx = RunContext {
        run_id: "integration",
        tool_version: env!("CARGO_PKG_VERSION"),
        config_hash: "",
        browser: kind,
        input_path: path,
    };
    let summary = RunSummary::new(&ctx, &opts, &report);
    let mut sink = metadata::build_sink(backend, out_dir, true).expect("sink");
    let limits = ReportLimits {
        include_visits: true,
        top_domains: 1000,
        recent_searches: 40,
    };
    metadata::write_report(sink.as_mut(), &report, &summary, limits).expect("write report");
    report
}
