use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::metadata::{MetadataError, ReportSink, RunSummary};
use crate::parsers::browser::{RawTimestamp, Visit};
use crate::search::SearchEvent;
use crate::sessions::Session;
use crate::stats::DomainCount;

pub struct CsvSink {
    visits_writer: Option<csv::Writer<File>>,
    sessions_writer: csv::Writer<File>,
    domains_writer: csv::Writer<File>,
    searches_writer: csv::Writer<File>,
    terms_writer: csv::Writer<File>,
    run_writer: csv::Writer<File>,
}

#[derive(Serialize)]
struct VisitCsv<'a> {
    visit_time: String,
    domain: &'a str,
    url: &'a str,
    title: Option<&'a str>,
    raw_timestamp: String,
}

#[derive(Serialize)]
struct SessionCsv<'a> {
    domain: &'a str,
    title: &'a str,
    url: &'a str,
    session_start: String,
    session_end: String,
    session_length_secs: i64,
    visit_count: u64,
}

#[derive(Serialize)]
struct SearchCsv<'a> {
    search_time: String,
    query: &'a str,
    search_url: &'a str,
    followup_index: Option<usize>,
    followup_time: Option<String>,
    followup_domain: Option<&'a str>,
    followup_url: Option<&'a str>,
    followup_title: Option<&'a str>,
}

#[derive(Serialize)]
struct SearchTermCsv<'a> {
    term: &'a str,
    count: u64,
}

const VISIT_HEADERS: &[&str] = &["visit_time", "domain", "url", "title", "raw_timestamp"];
const SESSION_HEADERS: &[&str] = &[
    "domain",
    "title",
    "url",
    "session_start",
    "session_end",
    "session_length_secs",
    "visit_count",
];
const DOMAIN_HEADERS: &[&str] = &["domain", "total_sessions", "total_visits"];
const SEARCH_HEADERS: &[&str] = &[
    "search_time",
    "query",
    "search_url",
    "followup_index",
    "followup_time",
    "followup_domain",
    "followup_url",
    "followup_title",
];
const TERM_HEADERS: &[&str] = &["term", "count"];
const RUN_HEADERS: &[&str] = &[
    "run_id",
    "tool_version",
    "config_hash",
    "browser",
    "input_path",
    "rows_read",
    "rows_dropped",
    "visits_decoded",
    "total_sessions",
    "unique_domains",
    "first_visit",
    "last_visit",
    "gap_minutes",
    "visit_threshold",
    "domains_below_threshold",
    "domains_at_or_above_threshold",
    "percent_below_threshold",
    "search_events",
];

fn open_writer(dir: &Path, name: &str, headers: &[&str]) -> Result<csv::Writer<File>, MetadataError> {
    let file = File::create(dir.join(name))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(headers)?;
    Ok(writer)
}

impl CsvSink {
    pub fn new(run_output_dir: &Path, include_visits: bool) -> Result<Self, MetadataError> {
        let meta_dir = run_output_dir.join("metadata");
        std::fs::create_dir_all(&meta_dir)?;

        let visits_writer = if include_visits {
            Some(open_writer(&meta_dir, "visits.csv", VISIT_HEADERS)?)
        } else {
            None
        };

        Ok(Self {
            visits_writer,
            sessions_writer: open_writer(&meta_dir, "sessions.csv", SESSION_HEADERS)?,
            domains_writer: open_writer(&meta_dir, "domain_counts.csv", DOMAIN_HEADERS)?,
            searches_writer: open_writer(&meta_dir, "searches.csv", SEARCH_HEADERS)?,
            terms_writer: open_writer(&meta_dir, "search_terms.csv", TERM_HEADERS)?,
            run_writer: open_writer(&meta_dir, "run_summary.csv", RUN_HEADERS)?,
        })
    }
}

impl ReportSink for CsvSink {
    fn record_visit(&mut self, visit: &Visit) -> Result<(), MetadataError> {
        let Some(writer) = self.visits_writer.as_mut() else {
            return Ok(());
        };
        let record = VisitCsv {
            visit_time: visit.visit_time.to_rfc3339(),
            domain: &visit.domain,
            url: &visit.url,
            title: visit.title.as_deref(),
            raw_timestamp: raw_timestamp_label(&visit.raw_timestamp),
        };
        writer.serialize(record)?;
        Ok(())
    }

    fn record_session(&mut self, session: &Session) -> Result<(), MetadataError> {
        let record = SessionCsv {
            domain: &session.domain,
            title: &session.title,
            url: &session.url,
            session_start: session.session_start.to_rfc3339(),
            session_end: session.session_end.to_rfc3339(),
            session_length_secs: session.duration().num_seconds(),
            visit_count: session.visit_count,
        };
        self.sessions_writer.serialize(record)?;
        Ok(())
    }

    fn record_domain_count(&mut self, count: &DomainCount) -> Result<(), MetadataError> {
        self.domains_writer.serialize(count)?;
        Ok(())
    }

    fn record_search(&mut self, event: &SearchEvent) -> Result<(), MetadataError> {
        let search_time = event.timestamp.to_rfc3339();
        if event.followups.is_empty() {
            self.searches_writer.serialize(SearchCsv {
                search_time,
                query: &event.query,
                search_url: &event.url,
                followup_index: None,
                followup_time: None,
                followup_domain: None,
                followup_url: None,
                followup_title: None,
            })?;
            return Ok(());
        }
        for (idx, followup) in event.followups.iter().enumerate() {
            self.searches_writer.serialize(SearchCsv {
                search_time: search_time.clone(),
                query: &event.query,
                search_url: &event.url,
                followup_index: Some(idx + 1),
                followup_time: Some(followup.visit_time.to_rfc3339()),
                followup_domain: Some(&followup.domain),
                followup_url: Some(&followup.url),
                followup_title: followup.title.as_deref(),
            })?;
        }
        Ok(())
    }

    fn record_search_term(&mut self, term: &str, count: u64) -> Result<(), MetadataError> {
        self.terms_writer.serialize(SearchTermCsv { term, count })?;
        Ok(())
    }

    fn record_run_summary(&mut self, summary: &RunSummary) -> Result<(), MetadataError> {
        self.run_writer.serialize(summary)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MetadataError> {
        if let Some(writer) = self.visits_writer.as_mut() {
            writer.flush()?;
        }
        self.sessions_writer.flush()?;
        self.domains_writer.flush()?;
        self.searches_writer.flush()?;
        self.terms_writer.flush()?;
        self.run_writer.flush()?;
        Ok(())
    }
}

fn raw_timestamp_label(raw: &RawTimestamp) -> String {
    match raw {
        RawTimestamp::Null => String::new(),
        RawTimestamp::Integer(i) => i.to_string(),
        RawTimestamp::Real(f) => f.to_string(),
        RawTimestamp::Text(t) => t.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn writes_csv_files() {
        let dir = tempdir().expect("tempdir");
        let mut sink = CsvSink::new(dir.path(), false).expect("csv sink");

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let session = Session {
            domain: "example.com".to_string(),
            title: "Example".to_string(),
            url: "https://example.com/".to_string(),
            session_start: start,
            session_end: start + Duration::minutes(12),
            visit_count: 3,
        };
        sink.record_session(&session).expect("record session");

        let search = SearchEvent {
            query: "rust".to_string(),
            timestamp: start,
            url: "https://google.com/search?q=rust".to_string(),
            followups: vec![
                Visit::synthetic("https://rust-lang.org/", Some("Rust"), start + Duration::minutes(1)),
                Visit::synthetic("https://docs.rs/", None, start + Duration::minutes(2)),
            ],
        };
        sink.record_search(&search).expect("record search");
        sink.flush().expect("flush");

        let meta = dir.path().join("metadata");
        assert!(!meta.join("visits.csv").exists());
        let sessions = std::fs::read_to_string(meta.join("sessions.csv")).expect("sessions");
        let mut lines = sessions.lines();
        assert_eq!(lines.next(), Some(SESSION_HEADERS.join(",").as_str()));
        let row = lines.next().expect("row");
        assert!(row.starts_with("example.com,Example,https://example.com/,"));
        assert!(row.ends_with(",720,3"));

        let searches = std::fs::read_to_string(meta.join("searches.csv")).expect("searches");
        assert_eq!(searches.lines().count(), 3);
        assert!(meta.join("run_summary.csv").exists());
    }
}
