//! Counters, gauges, and the periodic `metrics_minute` log line.
//!
//! Mirrors the source collector's per-minute logging cadence: every
//! `log_interval_sec` the current counters are snapshotted, logged, and
//! reset — so `/stats` always reflects "since the last minute boundary"
//! alongside the lifetime totals.

use std::collections::HashMap;
use std::sync::Arc;

use collector_domain::config::ObservabilityConfig;
use parking_lot::RwLock;
use serde_json::{json, Value};

pub struct Observability {
    counters: RwLock<HashMap<String, u64>>,
    minute_counters: RwLock<HashMap<String, u64>>,
    queue_depth: RwLock<u64>,
    last_event_ts: RwLock<Option<String>>,
    log_interval_sec: u64,
}

impl Observability {
    pub fn new(config: &ObservabilityConfig) -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            minute_counters: RwLock::new(HashMap::new()),
            queue_depth: RwLock::new(0),
            last_event_ts: RwLock::new(None),
            log_interval_sec: config.log_interval_sec,
        }
    }

    fn inc(&self, name: &str) {
        self.inc_by(name, 1);
    }

    fn inc_by(&self, name: &str, count: u64) {
        *self.counters.write().entry(name.to_string()).or_insert(0) += count;
        *self.minute_counters.write().entry(name.to_string()).or_insert(0) += count;
    }

    pub fn set_queue_depth(&self, depth: u64) {
        *self.queue_depth.write() = depth;
    }

    pub fn set_last_event_ts(&self, ts: &str) {
        *self.last_event_ts.write() = Some(ts.to_string());
    }

    pub fn record_drop(&self, reason: &str) {
        self.inc("pipeline.dropped_total");
        self.inc(&format!("drop.reason.{reason}"));
    }

    pub fn record_priority(&self, priority: &str) {
        match priority.trim().to_ascii_uppercase().as_str() {
            "P0" => self.inc("priority.p0_total"),
            "P1" => self.inc("priority.p1_total"),
            "P2" => self.inc("priority.p2_total"),
            _ => {}
        }
    }

    pub fn record_privacy_denied(&self) {
        self.inc("privacy.denied_total");
        self.record_drop("denylist");
    }

    pub fn record_ingest_received(&self, count: u64) {
        self.inc_by("ingest.received_total", count);
    }

    pub fn record_ingest_ok(&self, count: u64) {
        self.inc_by("ingest.ok_total", count);
    }

    pub fn record_ingest_invalid(&self) {
        self.inc("ingest.invalid_total");
        self.record_drop("schema");
    }

    pub fn record_store_insert_ok(&self, count: u64) {
        self.inc_by("store.insert_ok_total", count);
    }

    pub fn record_store_insert_fail(&self) {
        self.inc("store.insert_fail_total");
        self.record_drop("store_fail");
    }

    pub fn snapshot(&self, db_size_bytes: u64) -> Value {
        json!({
            "counters": self.counters.read().clone(),
            "gauges": {
                "queue.depth": *self.queue_depth.read(),
            },
            "minute_counters": self.minute_counters.read().clone(),
            "db_size_bytes": db_size_bytes,
            "last_event_ts": self.last_event_ts.read().clone(),
        })
    }

    /// Emit a `metrics_minute` log line with the current minute window's
    /// counters, then reset that window.
    pub fn log_and_reset_minute(&self) {
        let minute = self.minute_counters.read().clone();
        tracing::info!(target: "metrics_minute", counters = ?minute, "metrics_minute");
        self.minute_counters.write().clear();
    }

    pub fn log_interval_sec(&self) -> u64 {
        self.log_interval_sec.max(1)
    }
}

/// Spawn the periodic `metrics_minute` logger. Runs until the process exits.
pub fn spawn_minute_logger(observability: Arc<Observability>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(observability.log_interval_sec()));
        loop {
            interval.tick().await;
            observability.log_and_reset_minute();
        }
    });
}
