//! Per-domain parallel segmentation.
//!
//! Sessions never span domains, so the input can be split into one shard per
//! domain and each shard segmented on its own worker without shared state.

use std::collections::HashMap;

use crossbeam_channel::{bounded, unbounded};
use tracing::debug;

use crate::parsers::browser::Visit;
use crate::sessions::{SegmentError, Session, segment, segment_iter};

/// Split visits into per-domain shards, preserving input order inside each
/// shard. Shards are returned in first-seen domain order.
pub fn partition_by_domain(visits: &[Visit]) -> Vec<Vec<&Visit>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut shards: Vec<Vec<&Visit>> = Vec::new();
    for visit in visits {
        let slot = *index.entry(visit.domain.as_str()).or_insert_with(|| {
            shards.push(Vec::new());
            shards.len() - 1
        });
        shards[slot].push(visit);
    }
    shards
}

/// Segment with up to `workers` threads, one domain shard per job.
///
/// Output is the concatenation of each shard's sessions in first-seen domain
/// order. With `workers <= 1` this is plain [`segment`].
pub fn segment_parallel(
    visits: &[Visit],
    gap_minutes: u32,
    workers: usize,
) -> Result<Vec<Session>, SegmentError> {
    if workers <= 1 {
        return segment(visits, gap_minutes);
    }

    let shards = partition_by_domain(visits);
    let shard_count = shards.len();
    if shard_count <= 1 {
        return segment(visits, gap_minutes);
    }
    let workers = workers.min(shard_count);
    debug!(shards = shard_count, workers, "segmenting domain shards");

    let (job_tx, job_rx) = bounded::<(usize, Vec<&Visit>)>(workers * 2);
    let (result_tx, result_rx) = unbounded::<(usize, Result<Vec<Session>, SegmentError>)>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (slot, shard) in job_rx.iter() {
                    let outcome = segment_iter(shard, gap_minutes);
                    if result_tx.send((slot, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        for job in shards.into_iter().enumerate() {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);
    });

    let mut per_shard: Vec<Option<Result<Vec<Session>, SegmentError>>> =
        (0..shard_count).map(|_| None).collect();
    for (slot, outcome) in result_rx.iter() {
        per_shard[slot] = Some(outcome);
    }

    let mut sessions = Vec::new();
    for outcome in per_shard.into_iter().flatten() {
        sessions.extend(outcome?);
    }
    Ok(sessions)
}
