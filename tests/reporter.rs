mod helpers;

use helpers::fake_gauge_set;
use helpers::test_metrics::TestMetrics;
use osgauges::config::OutputFormat;
use osgauges::provider::fake::Response;
use osgauges::reporter::{Reporter, Snapshot};
use std::time::Duration;
use tokio::sync::watch;

#[test]
fn test_snapshot_covers_every_gauge() {
    let (set, provider, _) = fake_gauge_set();
    provider.set_value("os_family", "Linux");
    let gauges = set.metrics().unwrap();

    let snapshot = Snapshot::capture(&gauges);

    assert_eq!(snapshot.values.len(), gauges.len());
    assert_eq!(snapshot.values["os.family"], "Linux");
    assert!(chrono::DateTime::parse_from_rfc3339(&snapshot.timestamp).is_ok());
}

#[test]
fn test_publish_sets_numeric_gauges_only() {
    let (set, provider, _) = fake_gauge_set();
    provider.set_value("os_family", "Linux");
    provider.set_value("total_memory", 8192);
    provider.respond("cpu_temperature", Response::Unsupported);
    let snapshot = Snapshot::capture(&set.metrics().unwrap());

    let recorder = TestMetrics::new();
    let published = metrics::with_local_recorder(&recorder, || snapshot.publish());

    assert_eq!(published, snapshot.values.len() - 2);
    assert_eq!(recorder.get_gauge("hw.mem.total"), Some(8192.0));
    assert_eq!(recorder.get_gauge("os.family"), None);
    assert_eq!(recorder.get_gauge("hw.sensors.cpu.temperature"), None);
    assert_eq!(recorder.gauge_names().len(), published);
}

#[test]
fn test_report_counts_snapshots() {
    let (set, _, _) = fake_gauge_set();
    let mut reporter = Reporter::new(set.metrics().unwrap(), OutputFormat::Json, false, Vec::new());

    let recorder = TestMetrics::new();
    metrics::with_local_recorder(&recorder, || {
        reporter.report().unwrap();
        reporter.report().unwrap();
    });

    assert_eq!(recorder.get_counter("osgauges_snapshots_total"), 2);
    assert!(recorder.gauge_names().is_empty());

    let written = String::from_utf8(reporter.into_inner()).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["values"]["self.pid"], "1");
    }
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let (set, provider, _) = fake_gauge_set();
    let gauges = set.metrics().unwrap();
    let reporter = Reporter::new(gauges, OutputFormat::PlainText, false, Vec::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let task = tokio::spawn(reporter.run(Duration::from_secs(3600), shutdown_rx));

    // The first tick fires immediately.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();

    let out = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("reporter should stop")
        .unwrap();
    let written = String::from_utf8(out).unwrap();

    assert!(written.starts_with("# "));
    assert!(written.contains("os.bits = 1\n"));
    assert_eq!(provider.get_call_count("os_bitness"), 1);
}
