//! # Pipeline Module
//!
//! Runs one analysis end to end: decode and enrich raw rows, segment them into
//! sessions and derive the domain, threshold and search views. Everything is
//! computed in memory from a fully materialized row set.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::parsers::browser::{BrowserKind, RawVisitRow, Visit};
use crate::parsers::domain::normalize_domain;
use crate::parsers::time::{TimestampError, decode_timestamp};
use crate::search::{
    DEFAULT_LOOKAHEAD, DEFAULT_SEARCH_MARKER, SearchEvent, SearchMatcher,
    extract_search_events_with, search_term_frequencies,
};
use crate::sessions::shard::segment_parallel;
use crate::sessions::{DEFAULT_GAP_MINUTES, Session, sort_for_segmentation, sort_sessions};
use crate::stats::{
    DEFAULT_VISIT_THRESHOLD, DomainCount, SessionSummary, ThresholdBucket, aggregate_by_domain,
    domains_below, summarize_sessions, threshold_counts,
};

/// Knobs consumed by [`analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub gap_minutes: u32,
    pub visit_threshold: u64,
    pub lookahead: usize,
    pub search_marker: String,
    pub search_case_sensitive: bool,
    pub workers: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            gap_minutes: DEFAULT_GAP_MINUTES,
            visit_threshold: DEFAULT_VISIT_THRESHOLD,
            lookahead: DEFAULT_LOOKAHEAD,
            search_marker: DEFAULT_SEARCH_MARKER.to_string(),
            search_case_sensitive: false,
            workers: 1,
        }
    }
}

impl AnalysisOptions {
    pub fn from_config(cfg: &Config, workers: usize) -> Self {
        Self {
            gap_minutes: cfg.gap_minutes,
            visit_threshold: cfg.visit_threshold,
            lookahead: cfg.lookahead,
            search_marker: cfg.search_marker.clone(),
            search_case_sensitive: cfg.search_case_sensitive,
            workers,
        }
    }
}

/// Decoded visits plus how many rows could not be decoded.
#[derive(Debug, Clone, Default)]
pub struct Enriched {
    pub visits: Vec<Visit>,
    pub dropped: usize,
}

/// Decode timestamps and attach domains. Rows whose timestamp fails to decode
/// are dropped and counted; rows with bad URLs are kept under the sentinel domain.
pub fn enrich(rows: Vec<RawVisitRow>, kind: BrowserKind) -> Enriched {
    let mut out = Enriched {
        visits: Vec::with_capacity(rows.len()),
        dropped: 0,
    };
    for row in rows {
        match decode_timestamp(&row.raw_timestamp, kind) {
            Ok(visit_time) => out.visits.push(Visit {
                domain: normalize_domain(&row.url),
                url: row.url,
                title: row.title,
                raw_timestamp: row.raw_timestamp,
                visit_time,
            }),
            Err(err) => {
                if !matches!(err, TimestampError::Missing) {
                    debug!(url = %row.url, "dropping visit: {err}");
                }
                out.dropped += 1;
            }
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    /// Decoded visits in chronological order.
    pub visits: Vec<Visit>,
    /// Sessions ordered by start time, then domain.
    pub sessions: Vec<Session>,
    pub session_summary: SessionSummary,
    pub domain_counts: Vec<DomainCount>,
    pub threshold: ThresholdBucket,
    pub below_threshold: Vec<DomainCount>,
    pub searches: Vec<SearchEvent>,
    pub search_terms: Vec<(String, u64)>,
}

/// Run the full analysis over one history's rows.
pub fn analyze(
    rows: Vec<RawVisitRow>,
    kind: BrowserKind,
    opts: &AnalysisOptions,
) -> Result<AnalysisReport> {
    let rows_read = rows.len();
    let Enriched { mut visits, dropped } = enrich(rows, kind);
    if dropped > 0 {
        warn!("dropped {dropped} of {rows_read} visits with undecodable timestamps");
    }
    if visits.is_empty() {
        info!("no decodable visits in input");
    }

    visits.sort_by_key(|v| v.visit_time);

    let mut by_domain = visits.clone();
    sort_for_segmentation(&mut by_domain);
    let mut sessions = segment_parallel(&by_domain, opts.gap_minutes, opts.workers)
        .context("segmenting visits into sessions")?;
    drop(by_domain);
    sort_sessions(&mut sessions);

    let domain_counts = aggregate_by_domain(&sessions);
    let threshold = threshold_counts(&domain_counts, opts.visit_threshold);
    let below_threshold = domains_below(&domain_counts, opts.visit_threshold);

    let matcher = SearchMatcher::new(&opts.search_marker, opts.search_case_sensitive)
        .context("building search matcher")?;
    let searches = extract_search_events_with(&visits, &matcher, opts.lookahead)
        .context("extracting search events")?;
    let search_terms = search_term_frequencies(&searches);

    let session_summary = summarize_sessions(&sessions);
    info!(
        visits = visits.len(),
        sessions = session_summary.total_sessions,
        domains = session_summary.unique_domains,
        searches = searches.len(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        rows_read,
        rows_dropped: dropped,
        visits,
        sessions,
        session_summary,
        domain_counts,
        threshold,
        below_threshold,
        searches,
        search_terms,
    })
}
