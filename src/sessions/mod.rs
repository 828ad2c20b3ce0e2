//! # Session Segmentation
//!
//! Folds a stream of decoded visits into browsing sessions. A session is a run
//! of visits to one domain where no two consecutive visits are further apart
//! than the configured gap. Each domain has at most one open session at a
//! time, so memory is bounded by the number of distinct domains.

pub mod shard;

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::parsers::browser::Visit;

/// Title given to sessions whose visits never carried one.
pub const UNTITLED: &str = "Untitled";
pub const DEFAULT_GAP_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub domain: String,
    pub title: String,
    pub url: String,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub visit_count: u64,
}

impl Session {
    fn open(visit: &Visit) -> Self {
        Self {
            domain: visit.domain.clone(),
            title: visit.title_text().unwrap_or(UNTITLED).to_string(),
            url: visit.url.clone(),
            session_start: visit.visit_time,
            session_end: visit.visit_time,
            visit_count: 1,
        }
    }

    fn extend(&mut self, visit: &Visit) {
        self.session_end = visit.visit_time;
        self.visit_count += 1;
        if let Some(title) = visit.title_text() {
            self.title = title.to_string();
        }
    }

    /// Time between the first and last visit; zero for single-visit sessions.
    pub fn duration(&self) -> Duration {
        self.session_end - self.session_start
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SegmentError {
    #[error("visits for domain {domain:?} are out of order: {visit_time} follows {previous}")]
    OutOfOrder {
        domain: String,
        previous: DateTime<Utc>,
        visit_time: DateTime<Utc>,
    },
}

/// Fold accumulator: one open session per domain plus everything already closed.
struct SegmentState {
    gap: Duration,
    open: HashMap<String, Session>,
    // first-seen domain order, so the final flush is deterministic
    order: Vec<String>,
    closed: Vec<Session>,
}

impl SegmentState {
    fn new(gap_minutes: u32) -> Self {
        Self {
            gap: Duration::minutes(i64::from(gap_minutes)),
            open: HashMap::new(),
            order: Vec::new(),
            closed: Vec::new(),
        }
    }

    fn push(mut self, visit: &Visit) -> Result<Self, SegmentError> {
        let Some(current) = self.open.get_mut(&visit.domain) else {
            self.order.push(visit.domain.clone());
            self.open.insert(visit.domain.clone(), Session::open(visit));
            return Ok(self);
        };

        if visit.visit_time < current.session_end {
            return Err(SegmentError::OutOfOrder {
                domain: visit.domain.clone(),
                previous: current.session_end,
                visit_time: visit.visit_time,
            });
        }

        if visit.visit_time - current.session_end > self.gap {
            let finished = std::mem::replace(current, Session::open(visit));
            self.closed.push(finished);
        } else {
            current.extend(visit);
        }
        Ok(self)
    }

    fn finish(mut self) -> Vec<Session> {
        for domain in &self.order {
            if let Some(session) = self.open.remove(domain) {
                self.closed.push(session);
            }
        }
        self.closed
    }
}

/// Segment visits into sessions.
///
/// Visits of each domain must be in ascending `visit_time` order; visits of
/// different domains may be interleaved freely. A regression within a domain
/// is rejected rather than mis-segmented. Two visits exactly `gap_minutes`
/// apart stay in the same session.
///
/// Sessions closed during the scan are emitted first, in closing order, then
/// the sessions still open at the end in first-seen domain order.
pub fn segment(visits: &[Visit], gap_minutes: u32) -> Result<Vec<Session>, SegmentError> {
    segment_iter(visits, gap_minutes)
}

pub fn segment_iter<'a, I>(visits: I, gap_minutes: u32) -> Result<Vec<Session>, SegmentError>
where
    I: IntoIterator<Item = &'a Visit>,
{
    let state = visits
        .into_iter()
        .try_fold(SegmentState::new(gap_minutes), SegmentState::push)?;
    let sessions = state.finish();
    debug!(sessions = sessions.len(), gap_minutes, "segmented visits");
    Ok(sessions)
}

/// Order visits by `(domain, visit_time)`, the order [`segment`] expects.
pub fn sort_for_segmentation(visits: &mut [Visit]) {
    visits.sort_by(|a, b| {
        a.domain
            .cmp(&b.domain)
            .then_with(|| a.visit_time.cmp(&b.visit_time))
    });
}

/// Order sessions for presentation: by start, then domain.
pub fn sort_sessions(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        a.session_start
            .cmp(&b.session_start)
            .then_with(|| a.domain.cmp(&b.domain))
    });
}
