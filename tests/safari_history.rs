mod common;

use chrono::{Duration, TimeZone, Utc};

use history_sessions::parsers::browser::BrowserKind;
use history_sessions::pipeline::AnalysisOptions;
use history_sessions::sessions::UNTITLED;

use common::{analyze_file, base_time, safari_seconds, write_safari_history};

#[test]
fn segments_safari_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let t0 = base_time();
    let db = write_safari_history(
        dir.path(),
        &[
            ("https://www.apple.com/", None, safari_seconds(t0)),
            ("https://www.apple.com/mac/", Some("Mac"), safari_seconds(t0 + Duration::minutes(5))),
            ("https://developer.apple.com/", Some("Developer"), safari_seconds(t0 + Duration::minutes(6))),
            ("https://www.apple.com/", None, safari_seconds(t0 + Duration::hours(2))),
        ],
    );

    let report = analyze_file(&db, BrowserKind::Safari, &AnalysisOptions::default());
    assert_eq!(report.rows_read, 4);
    assert_eq!(report.sessions.len(), 3);

    let first = &report.sessions[0];
    assert_eq!(first.domain, "apple.com");
    assert_eq!(first.visit_count, 2);
    assert_eq!(first.title, "Mac");
    assert_eq!(first.session_start, t0);

    let last = report.sessions.last().expect("last");
    assert_eq!(last.domain, "apple.com");
    assert_eq!(last.title, UNTITLED);
    assert_eq!(last.session_start, t0 + Duration::hours(2));

    assert_eq!(report.domain_counts[0].domain, "apple.com");
    assert_eq!(report.domain_counts[0].total_sessions, 2);
    assert_eq!(report.domain_counts[0].total_visits, 3);
}

#[test]
fn rounds_fractional_core_data_seconds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = write_safari_history(
        dir.path(),
        &[
            ("https://example.com/a", Some("A"), 700_000_000.49),
            ("https://example.com/b", Some("B"), 700_000_000.5),
        ],
    );
    let report = analyze_file(&db, BrowserKind::Safari, &AnalysisOptions::default());
    let start = Utc.with_ymd_and_hms(2023, 3, 8, 20, 26, 40).unwrap();
    assert_eq!(report.visits[0].visit_time, start);
    assert_eq!(report.visits[1].visit_time, start + Duration::seconds(1));
    assert_eq!(report.sessions.len(), 1);
    assert_eq!(report.sessions[0].title, "B");
}
