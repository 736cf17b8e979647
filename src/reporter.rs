//! Periodic snapshot reporting.
//!
//! A `Snapshot` is one pass over a `GaugeMap`: every key read once, stamped
//! with the wall-clock time of the pass. The `Reporter` takes a snapshot on
//! every tick of its interval, optionally mirrors the numeric readings into
//! the `metrics` facade, and writes the rendering to its output sink.

use crate::config::OutputFormat;
use crate::gauge::{read_all, GaugeMap};
use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info};
use metrics::Unit;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;
use tokio::sync::watch;

/// The current value of every gauge in a map.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    pub timestamp: String,
    pub values: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn capture(gauges: &GaugeMap) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            values: read_all(gauges),
        }
    }

    /// Renders the snapshot as `key = value` lines or as a single JSON object.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string(self)?),
            OutputFormat::PlainText => {
                let mut out = format!("# {}\n", self.timestamp);
                for (key, value) in &self.values {
                    out.push_str(key);
                    out.push_str(" = ");
                    out.push_str(value);
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }

    /// Sets a `metrics` gauge for every value that parses as a number.
    ///
    /// Returns the number of gauges set. Empty and textual values are skipped.
    pub fn publish(&self) -> usize {
        let mut published = 0;
        for (key, value) in &self.values {
            if let Ok(number) = value.parse::<f64>() {
                metrics::gauge!(key.clone()).set(number);
                published += 1;
            }
        }
        published
    }
}

/// Writes a snapshot of a gauge map to `out` on every tick.
pub struct Reporter<W> {
    gauges: GaugeMap,
    format: OutputFormat,
    publish: bool,
    out: W,
}

impl<W: Write + Send> Reporter<W> {
    pub fn new(gauges: GaugeMap, format: OutputFormat, publish: bool, out: W) -> Self {
        metrics::describe_counter!(
            "osgauges_snapshots_total",
            Unit::Count,
            "Total number of gauge snapshots taken by the reporter."
        );
        Self {
            gauges,
            format,
            publish,
            out,
        }
    }

    /// Takes one snapshot and writes it to the sink.
    pub fn report(&mut self) -> Result<Snapshot> {
        let snapshot = Snapshot::capture(&self.gauges);
        debug!("Captured {} gauges at {}", snapshot.values.len(), snapshot.timestamp);

        if self.publish {
            let published = snapshot.publish();
            debug!("Published {} numeric gauges", published);
        }
        metrics::counter!("osgauges_snapshots_total").increment(1);

        let mut rendered = snapshot.render(self.format)?;
        if !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        self.out.write_all(rendered.as_bytes())?;
        self.out.flush()?;
        Ok(snapshot)
    }

    /// Reports every `interval` until a shutdown signal arrives or the
    /// shutdown sender is dropped. The first report happens immediately.
    pub async fn run(mut self, interval: Duration, mut shutdown_rx: watch::Receiver<()>) -> W {
        info!("Reporter started, interval {}s.", interval.as_secs_f64());
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Reporter received shutdown signal.");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.report() {
                        error!("Failed to write snapshot: {}", e);
                    }
                }
            }
        }
        self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauge::{Gauge, LazyGauge};
    use std::sync::Arc;

    fn gauges() -> GaugeMap {
        let mut map = GaugeMap::new();
        let bits: Arc<dyn Gauge> = Arc::new(LazyGauge::new(|| Ok(Some(64u32))));
        let family: Arc<dyn Gauge> = Arc::new(LazyGauge::new(|| Ok(Some("Linux".to_string()))));
        let missing: Arc<dyn Gauge> = Arc::new(LazyGauge::new(|| Ok(None::<u64>)));
        map.insert("os.bits".to_string(), bits);
        map.insert("os.family".to_string(), family);
        map.insert("hw.sensors.cpu.temperature".to_string(), missing);
        map
    }

    #[test]
    fn test_plain_text_rendering() {
        let snapshot = Snapshot {
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            values: read_all(&gauges()),
        };
        let rendered = snapshot.render(OutputFormat::PlainText).unwrap();

        assert_eq!(
            rendered,
            "# 2024-01-01T00:00:00+00:00\n\
             hw.sensors.cpu.temperature = \n\
             os.bits = 64\n\
             os.family = Linux\n"
        );
    }

    #[test]
    fn test_json_rendering() {
        let snapshot = Snapshot::capture(&gauges());
        let rendered = snapshot.render(OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(parsed["values"]["os.bits"], "64");
        assert_eq!(parsed["values"]["hw.sensors.cpu.temperature"], "");
        assert!(parsed["timestamp"].is_string());
    }

    #[test]
    fn test_publish_skips_non_numeric_values() {
        let snapshot = Snapshot::capture(&gauges());
        assert_eq!(snapshot.publish(), 1);
    }

    #[test]
    fn test_report_writes_to_sink() {
        let mut reporter = Reporter::new(gauges(), OutputFormat::PlainText, false, Vec::new());
        let snapshot = reporter.report().unwrap();
        let written = String::from_utf8(reporter.into_inner()).unwrap();

        assert_eq!(snapshot.values.len(), 3);
        assert!(written.contains("os.family = Linux\n"));
    }
}
