use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use history_sessions::parsers::browser::Visit;
use history_sessions::sessions::shard::segment_parallel;
use history_sessions::sessions::{segment, sort_for_segmentation};

fn synthetic_history(visits: usize, domains: usize) -> Vec<Visit> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut out: Vec<Visit> = (0..visits)
        .map(|i| {
            let url = format!("https://site{}.test/page/{i}", i % domains);
            // every seventh visit follows a long idle period
            let offset = Duration::minutes((i as i64) * 3 + (i as i64 / 7) * 40);
            Visit::synthetic(&url, Some("page"), t0 + offset)
        })
        .collect();
    sort_for_segmentation(&mut out);
    out
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");
    for &size in &[10_000usize, 100_000] {
        let visits = synthetic_history(size, 250);
        group.bench_with_input(BenchmarkId::new("sequential", size), &visits, |b, visits| {
            b.iter(|| segment(visits, 30).expect("segment"))
        });
        group.bench_with_input(BenchmarkId::new("sharded_4", size), &visits, |b, visits| {
            b.iter(|| segment_parallel(visits, 30, 4).expect("segment"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_segmentation);
criterion_main!(benches);
