//! # Session Statistics
//!
//! Reductions over segmented sessions: per-domain session counts, the
//! below/at-or-above threshold split and the summary shown above session
//! tables.

use std::collections::HashMap;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::parsers::domain::is_sentinel_domain;
use crate::sessions::Session;

pub const DEFAULT_VISIT_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub total_sessions: u64,
    /// Sum of `visit_count` over the domain's sessions.
    pub total_visits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ThresholdBucket {
    pub threshold: u64,
    pub below_count: u64,
    pub at_or_above_count: u64,
}

impl ThresholdBucket {
    pub fn total(&self) -> u64 {
        self.below_count + self.at_or_above_count
    }

    /// Share of domains below the threshold, `None` when there are no domains.
    pub fn percent_below(&self) -> Option<f64> {
        percent(self.below_count, self.total())
    }

    pub fn percent_at_or_above(&self) -> Option<f64> {
        percent(self.at_or_above_count, self.total())
    }
}

fn percent(part: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(part as f64 * 100.0 / total as f64)
}

/// Count sessions per domain, most sessions first.
///
/// Ties keep first-seen domain order. Sessions under the unknown-domain
/// sentinel are skipped.
pub fn aggregate_by_domain(sessions: &[Session]) -> Vec<DomainCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<DomainCount> = Vec::new();
    for session in sessions {
        if is_sentinel_domain(&session.domain) {
            continue;
        }
        let slot = *index.entry(session.domain.as_str()).or_insert_with(|| {
            counts.push(DomainCount {
                domain: session.domain.clone(),
                total_sessions: 0,
                total_visits: 0,
            });
            counts.len() - 1
        });
        counts[slot].total_sessions += 1;
        counts[slot].total_visits += session.visit_count;
    }
    // sort_by is stable, which is what keeps ties in first-seen order
    counts.sort_by(|a, b| b.total_sessions.cmp(&a.total_sessions));
    counts
}

/// Split domains into `total_sessions < threshold` and `>= threshold`.
pub fn threshold_counts(domain_counts: &[DomainCount], threshold: u64) -> ThresholdBucket {
    let below_count = domain_counts
        .iter()
        .filter(|c| c.total_sessions < threshold)
        .count() as u64;
    ThresholdBucket {
        threshold,
        below_count,
        at_or_above_count: domain_counts.len() as u64 - below_count,
    }
}

/// The `n` most visited domains.
pub fn top_domains(domain_counts: &[DomainCount], n: usize) -> &[DomainCount] {
    &domain_counts[..n.min(domain_counts.len())]
}

/// Domains seen fewer than `threshold` times, in the same order as the input.
pub fn domains_below(domain_counts: &[DomainCount], threshold: u64) -> Vec<DomainCount> {
    domain_counts
        .iter()
        .filter(|c| c.total_sessions < threshold)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionSummary {
    pub total_sessions: u64,
    pub unique_domains: u64,
    pub first_start: Option<DateTime<Utc>>,
    pub last_end: Option<DateTime<Utc>>,
}

pub fn summarize_sessions(sessions: &[Session]) -> SessionSummary {
    let domains: HashSet<&str> = sessions.iter().map(|s| s.domain.as_str()).collect();
    SessionSummary {
        total_sessions: sessions.len() as u64,
        unique_domains: domains.len() as u64,
        first_start: sessions.iter().map(|s| s.session_start).min(),
        last_end: sessions.iter().map(|s| s.session_end).max(),
    }
}
