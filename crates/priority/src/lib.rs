//! Priority classification, debouncing, and focus-block synthesis.
//!
//! [`PriorityProcessor`] is the single stateful owner of "what is the
//! user focused on right now" — it classifies each inbound event into
//! P0/P1/P2, collapses noisy foreground-change chatter into debounced
//! `os.app_focus_block` summaries, and sheds low-priority traffic when
//! the ingest queue is under pressure.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use collector_domain::model::{is_valid_priority, EventEnvelope, PrivacyMetadata, ResourceRef};

const P0_EVENT_TYPES: &[&str] = &[
    "outlook.send_clicked",
    "excel.export_pdf",
    "excel.export_csv",
    "excel.save_as",
    "os.file_saved",
    "excel.refresh_pivot",
    "upload_done",
    "share_link_created",
];

const P1_EVENT_TYPES: &[&str] = &[
    "os.app_focus_block",
    "os.file_opened",
    "excel.workbook_opened",
    "outlook.compose_started",
    "outlook.attachment_added_meta",
];

const P2_EVENT_TYPES: &[&str] = &[
    "os.foreground_changed",
    "os.window_title_changed",
    "os.clipboard_meta",
];

const DEBOUNCE_EVENT_TYPES: &[&str] = &["os.foreground_changed", "os.window_title_changed"];

struct FocusState {
    envelope: EventEnvelope,
    ts: Option<f64>,
}

/// Why an event was dropped, for observability counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    QueueOverflow,
    Debounce,
}

pub struct PriorityProcessor {
    debounce_seconds: f64,
    focus_event_types: HashSet<String>,
    focus_block_event_type: String,
    drop_p2_when_queue_over: f64,
    p0_set: HashSet<String>,
    p1_set: HashSet<String>,
    p2_set: HashSet<String>,

    last_event_ts: HashMap<(String, String, String), f64>,
    focus_state: Option<FocusState>,
}

impl PriorityProcessor {
    pub fn new(config: &collector_domain::config::PriorityConfig) -> Self {
        let mut p0_set: HashSet<String> = P0_EVENT_TYPES.iter().map(|s| s.to_string()).collect();
        let mut p1_set: HashSet<String> = P1_EVENT_TYPES.iter().map(|s| s.to_string()).collect();
        let mut p2_set: HashSet<String> = P2_EVENT_TYPES.iter().map(|s| s.to_string()).collect();
        p0_set.extend(config.p0_event_types.iter().map(|s| s.to_ascii_lowercase()));
        p1_set.extend(config.p1_event_types.iter().map(|s| s.to_ascii_lowercase()));
        p2_set.extend(config.p2_event_types.iter().map(|s| s.to_ascii_lowercase()));

        Self {
            debounce_seconds: config.debounce_seconds,
            focus_event_types: config
                .focus_event_types
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            focus_block_event_type: config.focus_block_event_type.clone(),
            drop_p2_when_queue_over: config.drop_p2_when_queue_over,
            p0_set,
            p1_set,
            p2_set,
            last_event_ts: HashMap::new(),
            focus_state: None,
        }
    }

    /// Process one inbound event. `queue_ratio` is the ingest queue's
    /// current fill level (0.0 empty, 1.0 full) and drives P2 shedding.
    /// Returns zero or more events to forward downstream — zero when the
    /// event was dropped or absorbed into the running focus block, one
    /// normally, or occasionally two when a focus-block boundary closes.
    pub fn process(&mut self, mut envelope: EventEnvelope, queue_ratio: f64) -> (Vec<EventEnvelope>, Option<DropReason>) {
        let event_type = envelope.event_type_lower();
        envelope.priority = classify_priority(&event_type, &envelope.priority, &self.p0_set, &self.p1_set, &self.p2_set);

        if envelope.priority == "P2" && queue_ratio >= self.drop_p2_when_queue_over {
            return (Vec::new(), Some(DropReason::QueueOverflow));
        }

        if self.focus_event_types.contains(&event_type) {
            return (self.handle_focus_event(envelope), None);
        }

        if DEBOUNCE_EVENT_TYPES.contains(&event_type.as_str()) && self.should_debounce(&envelope, &event_type) {
            return (Vec::new(), Some(DropReason::Debounce));
        }

        (vec![envelope], None)
    }

    /// Flush any in-flight focus block, e.g. on shutdown or idle timeout.
    pub fn flush(&mut self) -> Vec<EventEnvelope> {
        if self.focus_state.is_none() {
            return Vec::new();
        }
        self.emit_focus_block(Utc::now().timestamp() as f64)
    }

    fn should_debounce(&mut self, envelope: &EventEnvelope, event_type: &str) -> bool {
        let Some(ts) = to_epoch(&envelope.ts) else {
            return false;
        };
        let key = (event_type.to_string(), envelope.app.clone(), envelope.resource.id.clone());
        let last_ts = self.last_event_ts.insert(key, ts);
        match last_ts {
            Some(prev) => (ts - prev) < self.debounce_seconds,
            None => false,
        }
    }

    fn handle_focus_event(&mut self, envelope: EventEnvelope) -> Vec<EventEnvelope> {
        let ts = to_epoch(&envelope.ts);
        let mut emitted = Vec::new();
        if self.focus_state.is_some() {
            if let Some(ts) = ts {
                emitted = self.emit_focus_block(ts);
            }
        }
        self.focus_state = Some(FocusState { envelope, ts });
        emitted
    }

    fn emit_focus_block(&mut self, ts: f64) -> Vec<EventEnvelope> {
        let Some(prev) = self.focus_state.take() else {
            return Vec::new();
        };
        let Some(prev_ts) = prev.ts else {
            return Vec::new();
        };
        let duration = (ts - prev_ts).max(0.0);
        if duration < self.debounce_seconds {
            return Vec::new();
        }

        let mut payload = prev.envelope.payload.clone();
        payload.insert("duration_sec".into(), (duration as i64).into());

        let priority = classify_priority(&self.focus_block_event_type, "P1", &self.p0_set, &self.p1_set, &self.p2_set);

        let block_event = EventEnvelope {
            schema_version: prev.envelope.schema_version,
            event_id: uuid::Uuid::new_v4().to_string(),
            ts: prev.envelope.ts,
            source: prev.envelope.source,
            app: prev.envelope.app,
            event_type: self.focus_block_event_type.clone(),
            priority,
            resource: ResourceRef {
                kind: prev.envelope.resource.kind,
                id: prev.envelope.resource.id,
            },
            payload,
            privacy: PrivacyMetadata {
                pii_level: prev.envelope.privacy.pii_level,
                redaction: prev.envelope.privacy.redaction,
            },
            pid: prev.envelope.pid,
            window_id: prev.envelope.window_id,
            raw: prev.envelope.raw,
        };

        vec![block_event]
    }
}

fn classify_priority(
    event_type: &str,
    current: &str,
    p0_set: &HashSet<String>,
    p1_set: &HashSet<String>,
    p2_set: &HashSet<String>,
) -> String {
    if p0_set.contains(event_type) {
        "P0".into()
    } else if p1_set.contains(event_type) {
        "P1".into()
    } else if p2_set.contains(event_type) {
        "P2".into()
    } else if is_valid_priority(current) {
        current.into()
    } else {
        "P1".into()
    }
}

fn to_epoch(ts: &str) -> Option<f64> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .map(|dt| dt.timestamp() as f64 + dt.timestamp_subsec_millis() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_domain::config::PriorityConfig;

    fn envelope(event_type: &str, ts: &str, app: &str) -> EventEnvelope {
        EventEnvelope {
            schema_version: "1.0".into(),
            event_id: "evt".into(),
            ts: ts.into(),
            source: "macos".into(),
            app: app.into(),
            event_type: event_type.into(),
            priority: "P1".into(),
            resource: ResourceRef::unknown(),
            payload: Default::default(),
            privacy: PrivacyMetadata::unknown(),
            pid: None,
            window_id: None,
            raw: Default::default(),
        }
    }

    #[test]
    fn classifies_known_p0_event_types() {
        let mut proc = PriorityProcessor::new(&PriorityConfig::default());
        let (out, drop) = proc.process(envelope("os.file_saved", "2026-07-31T12:00:00Z", "excel"), 0.0);
        assert_eq!(out[0].priority, "P0");
        assert!(drop.is_none());
    }

    #[test]
    fn drops_p2_events_when_queue_is_near_full() {
        let mut proc = PriorityProcessor::new(&PriorityConfig::default());
        let (out, drop) = proc.process(
            envelope("os.clipboard_meta", "2026-07-31T12:00:00Z", "notes"),
            0.9,
        );
        assert!(out.is_empty());
        assert_eq!(drop, Some(DropReason::QueueOverflow));
    }

    #[test]
    fn debounces_rapid_repeated_window_title_changes() {
        let mut proc = PriorityProcessor::new(&PriorityConfig::default());
        let (first, _) = proc.process(envelope("os.window_title_changed", "2026-07-31T12:00:00Z", "chrome"), 0.0);
        assert_eq!(first.len(), 1);
        let (second, drop) = proc.process(envelope("os.window_title_changed", "2026-07-31T12:00:01Z", "chrome"), 0.0);
        assert!(second.is_empty());
        assert_eq!(drop, Some(DropReason::Debounce));
    }

    #[test]
    fn focus_events_emit_a_block_when_the_focus_changes() {
        let mut proc = PriorityProcessor::new(&PriorityConfig::default());
        let (first, _) = proc.process(envelope("os.foreground_changed", "2026-07-31T12:00:00Z", "chrome"), 0.0);
        assert!(first.is_empty());

        let (second, _) = proc.process(envelope("os.foreground_changed", "2026-07-31T12:00:10Z", "outlook"), 0.0);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].event_type, "os.app_focus_block");
        assert_eq!(second[0].app, "chrome");
        assert_eq!(second[0].payload.get("duration_sec").unwrap(), 10);
    }

    #[test]
    fn flush_emits_the_pending_focus_block() {
        let mut proc = PriorityProcessor::new(&PriorityConfig::default());
        proc.process(envelope("os.foreground_changed", "2000-01-01T00:00:00Z", "chrome"), 0.0);
        let flushed = proc.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].event_type, "os.app_focus_block");
    }
}
