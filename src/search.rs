//! # Search Extraction
//!
//! Finds search-engine result pages in the chronological visit stream by a
//! title marker (for Google, titles look like `rust lifetimes - Google Search`)
//! and pairs each search with the visits that immediately followed it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::parsers::browser::Visit;

pub const DEFAULT_SEARCH_MARKER: &str = "Google Search";
pub const DEFAULT_LOOKAHEAD: usize = 5;
pub const DEFAULT_RECENT_SEARCH_LIMIT: usize = 40;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search marker must not be empty")]
    EmptyMarker,
    #[error("invalid search marker: {0}")]
    Marker(#[from] regex::Error),
    #[error("visits are not in chronological order at position {position}")]
    Unsorted { position: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchEvent {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub followups: Vec<Visit>,
}

/// Recognizes search result titles and strips the marker from them.
#[derive(Debug, Clone)]
pub struct SearchMatcher {
    pattern: Regex,
}

impl SearchMatcher {
    pub fn new(marker: &str, case_sensitive: bool) -> Result<Self, SearchError> {
        if marker.trim().is_empty() {
            return Err(SearchError::EmptyMarker);
        }
        let pattern = RegexBuilder::new(&regex::escape(marker))
            .case_insensitive(!case_sensitive)
            .build()?;
        Ok(Self { pattern })
    }

    /// Query text for a matching title, `None` if the title is not a search.
    pub fn query(&self, title: &str) -> Option<String> {
        if !self.pattern.is_match(title) {
            return None;
        }
        let stripped = self.pattern.replace_all(title, "");
        Some(trim_separators(&stripped).to_string())
    }
}

// Titles join the query and the marker with " - ", " – " or " | ".
fn trim_separators(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '\u{2013}' | '\u{2014}' | '|'))
}

/// Case-insensitive extraction with the given marker.
pub fn extract_search_events(
    visits: &[Visit],
    marker: &str,
    lookahead: usize,
) -> Result<Vec<SearchEvent>, SearchError> {
    let matcher = SearchMatcher::new(marker, false)?;
    extract_search_events_with(visits, &matcher, lookahead)
}

/// Every search in `visits` with up to `lookahead` following visits.
///
/// `visits` must be sorted by `visit_time`; followups never run past the end
/// of the input.
pub fn extract_search_events_with(
    visits: &[Visit],
    matcher: &SearchMatcher,
    lookahead: usize,
) -> Result<Vec<SearchEvent>, SearchError> {
    if let Some(position) = visits
        .windows(2)
        .position(|pair| pair[1].visit_time < pair[0].visit_time)
    {
        return Err(SearchError::Unsorted {
            position: position + 1,
        });
    }

    let mut events = Vec::new();
    for (idx, visit) in visits.iter().enumerate() {
        let Some(query) = visit.title.as_deref().and_then(|t| matcher.query(t)) else {
            continue;
        };
        let end = idx.saturating_add(1).saturating_add(lookahead).min(visits.len());
        events.push(SearchEvent {
            query,
            timestamp: visit.visit_time,
            url: visit.url.clone(),
            followups: visits[idx + 1..end].to_vec(),
        });
    }
    Ok(events)
}

/// The `limit` most recent searches, newest first.
pub fn recent_searches(events: &[SearchEvent], limit: usize) -> Vec<&SearchEvent> {
    events.iter().rev().take(limit).collect()
}

/// Common English words left out of term counts.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for",
    "from", "how", "i", "in", "is", "it", "my", "of", "on", "or", "that", "the", "this", "to",
    "vs", "was", "what", "when", "where", "which", "who", "why", "will", "with", "you",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Lower-cased word counts over all queries, most frequent first, ties alphabetical.
/// Stopwords are skipped.
pub fn search_term_frequencies(events: &[SearchEvent]) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for event in events {
        for word in event
            .query
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .map(|w| w.trim_matches('\'').to_lowercase())
            .filter(|w| !w.is_empty() && !is_stopword(w))
        {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    let mut terms: Vec<(String, u64)> = counts.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    terms
}
