pub mod csv;
pub mod jsonl;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::parsers::browser::{BrowserKind, Visit};
use crate::pipeline::{AnalysisOptions, AnalysisReport};
use crate::search::{SearchEvent, recent_searches};
use crate::sessions::Session;
use crate::stats::{DomainCount, top_domains};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub tool_version: String,
    pub config_hash: String,
    pub browser: BrowserKind,
    pub input_path: String,
    pub rows_read: u64,
    pub rows_dropped: u64,
    pub visits_decoded: u64,
    pub total_sessions: u64,
    pub unique_domains: u64,
    pub first_visit: Option<DateTime<Utc>>,
    pub last_visit: Option<DateTime<Utc>>,
    pub gap_minutes: u32,
    pub visit_threshold: u64,
    pub domains_below_threshold: u64,
    pub domains_at_or_above_threshold: u64,
    pub percent_below_threshold: Option<f64>,
    pub search_events: u64,
}

/// Identifies the run a summary belongs to.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub run_id: &'a str,
    pub tool_version: &'a str,
    pub config_hash: &'a str,
    pub browser: BrowserKind,
    pub input_path: &'a Path,
}

impl RunSummary {
    pub fn new(ctx: &RunContext<'_>, opts: &AnalysisOptions, report: &AnalysisReport) -> Self {
        Self {
            run_id: ctx.run_id.to_string(),
            tool_version: ctx.tool_version.to_string(),
            config_hash: ctx.config_hash.to_string(),
            browser: ctx.browser,
            input_path: ctx.input_path.to_string_lossy().to_string(),
            rows_read: report.rows_read as u64,
            rows_dropped: report.rows_dropped as u64,
            visits_decoded: report.visits.len() as u64,
            total_sessions: report.session_summary.total_sessions,
            unique_domains: report.session_summary.unique_domains,
            first_visit: report.visits.first().map(|v| v.visit_time),
            last_visit: report.visits.last().map(|v| v.visit_time),
            gap_minutes: opts.gap_minutes,
            visit_threshold: report.threshold.threshold,
            domains_below_threshold: report.threshold.below_count,
            domains_at_or_above_threshold: report.threshold.at_or_above_count,
            percent_below_threshold: report.threshold.percent_below(),
            search_events: report.searches.len() as u64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MetadataBackendKind {
    Jsonl,
    Csv,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Output sink for the analysis report.
///
/// # Example
/// ```rust
/// use history_sessions::metadata::{self, MetadataBackendKind};
///
/// let run_output_dir = std::env::temp_dir().join("history_sessions_meta_example");
/// std::fs::create_dir_all(&run_output_dir).unwrap();
///
/// let mut sink = metadata::build_sink(MetadataBackendKind::Jsonl, &run_output_dir, false).unwrap();
/// sink.record_search_term("rust", 3).unwrap();
/// sink.flush().unwrap();
/// ```
pub trait ReportSink {
    fn record_visit(&mut self, visit: &Visit) -> Result<(), MetadataError>;
    fn record_session(&mut self, session: &Session) -> Result<(), MetadataError>;
    fn record_domain_count(&mut self, count: &DomainCount) -> Result<(), MetadataError>;
    fn record_search(&mut self, event: &SearchEvent) -> Result<(), MetadataError>;
    fn record_search_term(&mut self, term: &str, count: u64) -> Result<(), MetadataError>;
    fn record_run_summary(&mut self, summary: &RunSummary) -> Result<(), MetadataError>;
    fn flush(&mut self) -> Result<(), MetadataError>;
}

/// Build a sink writing under `<run_output_dir>/metadata`. The visit stream is
/// only opened when `include_visits` is set.
pub fn build_sink(
    backend: MetadataBackendKind,
    run_output_dir: &Path,
    include_visits: bool,
) -> Result<Box<dyn ReportSink>, MetadataError> {
    match backend {
        MetadataBackendKind::Jsonl => Ok(Box::new(jsonl::JsonlSink::new(run_output_dir, include_visits)?)),
        MetadataBackendKind::Csv => Ok(Box::new(csv::CsvSink::new(run_output_dir, include_visits)?)),
    }
}

/// What [`write_report`] emits beyond sessions and the summary.
#[derive(Debug, Clone, Copy)]
pub struct ReportLimits {
    pub include_visits: bool,
    pub top_domains: usize,
    pub recent_searches: usize,
}

/// Write a whole report through `sink` and flush it.
pub fn write_report(
    sink: &mut dyn ReportSink,
    report: &AnalysisReport,
    summary: &RunSummary,
    limits: ReportLimits,
) -> Result<(), MetadataError> {
    if limits.include_visits {
        for visit in &report.visits {
            sink.record_visit(visit)?;
        }
    }
    for session in &report.sessions {
        sink.record_session(session)?;
    }
    for count in top_domains(&report.domain_counts, limits.top_domains) {
        sink.record_domain_count(count)?;
    }
    for event in recent_searches(&report.searches, limits.recent_searches) {
        sink.record_search(event)?;
    }
    for (term, count) in &report.search_terms {
        sink.record_search_term(term, *count)?;
    }
    sink.record_run_summary(summary)?;
    sink.flush()
}
