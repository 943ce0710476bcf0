// tests/metrics_textfile.rs
// Installs the global recorder, so it lives in its own test binary.
mod support;

use job_watcher::metrics::Metrics;
use job_watcher::{FilterSpec, NotifierMux, SeenStore, WatchedSource, Watcher};
use support::*;

#[tokio::test]
async fn run_counters_land_in_textfile() {
    let metrics = Metrics::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let calls = log();

    let w = Watcher::new(
        vec![
            WatchedSource::new(
                Box::new(FakeSource::ok(
                    "Example",
                    vec![
                        cand("M1", "Software Engineer", ""),
                        cand("M2", "Senior Software Engineer", ""),
                    ],
                )),
                FilterSpec::new(vec!["software"], vec!["senior"], vec![]),
            ),
            WatchedSource::new(
                Box::new(FakeSource::failing("Broken", "boom")),
                FilterSpec::default(),
            ),
        ],
        NotifierMux::new(vec![Box::new(RecordingNotifier::failing("email", &calls))]),
        SeenStore::new(dir.path().join("seen.json")),
    );
    w.run_once().await.unwrap();

    let out = dir.path().join("prom/watcher.prom");
    metrics.write_textfile(&out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();

    for needle in [
        "watcher_candidates_total 2",
        "watcher_notified_total 1",
        "watcher_filtered_total 1",
        "watcher_source_errors_total 1",
        "watcher_delivery_failures_total{channel=\"email\"} 1",
        "watcher_seen_ids 1",
        "watcher_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing `{needle}` in:\n{text}");
    }
}
