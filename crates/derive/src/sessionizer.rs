//! Groups a flat event stream into sessions: bounded runs of activity
//! separated by idle gaps, explicit `os.idle_start` markers, or P0
//! (critical) events, which always close out the session they appear in.

use chrono::{DateTime, Utc};
use collector_domain::model::{AppTimelineEntry, ResourceRef, SessionCounts, SessionRecord, SessionSummary};
use collector_store::EventRow;
use serde_json::{Map, Value};

const IDLE_START_EVENT: &str = "os.idle_start";
const KEY_P1_TYPES: &[&str] = &[
    "outlook.compose_started",
    "outlook.attachment_added_meta",
    "excel.refresh_pivot",
];
const MAX_RESOURCES: usize = 20;

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub priority: String,
    pub app: String,
    pub resource_type: String,
    pub resource_id: String,
    pub payload: Map<String, Value>,
}

/// Parse raw stored event rows into [`SessionEvent`]s, sorted by
/// timestamp. Rows with an unparseable timestamp are skipped.
pub fn rows_to_events(rows: &[EventRow]) -> Vec<SessionEvent> {
    let mut events: Vec<SessionEvent> = rows
        .iter()
        .filter_map(|row| {
            let ts = DateTime::parse_from_rfc3339(&row.ts).ok()?.with_timezone(&Utc);
            let payload: Map<String, Value> = serde_json::from_str(&row.payload_json).unwrap_or_default();
            Some(SessionEvent {
                ts,
                event_type: row.event_type.clone(),
                priority: row.priority.clone(),
                app: row.app.clone().unwrap_or_default(),
                resource_type: row.resource_type.clone().unwrap_or_default(),
                resource_id: row.resource_id.clone().unwrap_or_default(),
                payload,
            })
        })
        .collect();
    events.sort_by_key(|e| e.ts);
    events
}

/// Split a sorted event stream into sessions on idle gaps, explicit idle
/// markers, and P0 boundaries.
pub fn sessionize(events: &[SessionEvent], gap_seconds: i64) -> Vec<Vec<SessionEvent>> {
    let mut sessions = Vec::new();
    let mut current: Vec<SessionEvent> = Vec::new();
    let mut last_ts: Option<DateTime<Utc>> = None;

    for event in events {
        if let Some(last) = last_ts {
            if gap_seconds > 0 && (event.ts - last).num_seconds() >= gap_seconds {
                flush_session(&mut current, &mut sessions);
                last_ts = None;
            }
        }

        if event.event_type.to_ascii_lowercase() == IDLE_START_EVENT {
            flush_session(&mut current, &mut sessions);
            last_ts = None;
            continue;
        }

        let is_p0 = event.priority.eq_ignore_ascii_case("P0");
        last_ts = Some(event.ts);
        current.push(event.clone());

        if is_p0 {
            flush_session(&mut current, &mut sessions);
            last_ts = None;
        }
    }

    flush_session(&mut current, &mut sessions);
    sessions
}

fn flush_session(current: &mut Vec<SessionEvent>, sessions: &mut Vec<Vec<SessionEvent>>) {
    if !current.is_empty() {
        sessions.push(std::mem::take(current));
    }
}

/// Build a persisted [`SessionRecord`] (with a derived session ID) from
/// each grouped run of events.
pub fn build_session_records(sessions: Vec<Vec<SessionEvent>>, extra_key_event_types: &[String]) -> Vec<SessionRecord> {
    sessions
        .into_iter()
        .filter(|events| !events.is_empty())
        .map(|events| {
            let start_ts = events.first().unwrap().ts;
            let end_ts = events.last().unwrap().ts;
            let duration_sec = (end_ts - start_ts).num_seconds().max(0);
            let summary = build_session_summary(&events, extra_key_event_types);
            SessionRecord {
                session_id: uuid::Uuid::new_v4().to_string(),
                start_ts: format_ts(start_ts),
                end_ts: format_ts(end_ts),
                duration_sec,
                summary,
            }
        })
        .collect()
}

/// Aggregate one session's events into the summary stored alongside it:
/// an app-usage timeline, notable (key) event types, touched resources,
/// and per-priority counts.
pub fn build_session_summary(events: &[SessionEvent], extra_key_event_types: &[String]) -> SessionSummary {
    SessionSummary {
        apps_timeline: apps_timeline(events),
        key_events: key_events(events, extra_key_event_types),
        resources: resources(events),
        counts: counts(events),
    }
}

fn apps_timeline(events: &[SessionEvent]) -> Vec<AppTimelineEntry> {
    let mut totals: Vec<(String, i64)> = Vec::new();
    for event in events {
        if event.event_type.to_ascii_lowercase() != "os.app_focus_block" {
            continue;
        }
        let duration = event
            .payload
            .get("duration_sec")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        if duration <= 0 {
            continue;
        }
        let app = if event.app.is_empty() { "unknown".to_string() } else { event.app.clone() };
        match totals.iter_mut().find(|(a, _)| *a == app) {
            Some((_, sec)) => *sec += duration,
            None => totals.push((app, duration)),
        }
    }
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals.into_iter().map(|(app, sec)| AppTimelineEntry { app, sec }).collect()
}

fn key_events(events: &[SessionEvent], extra_key_event_types: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for event in events {
        let event_type = event.event_type.to_ascii_lowercase();
        if event_type.is_empty() {
            continue;
        }
        let include = event.priority.eq_ignore_ascii_case("P0")
            || KEY_P1_TYPES.contains(&event_type.as_str())
            || extra_key_event_types.iter().any(|t| t.eq_ignore_ascii_case(&event_type));
        if include && seen.insert(event_type.clone()) {
            ordered.push(event_type);
        }
    }
    ordered
}

fn resources(events: &[SessionEvent]) -> Vec<ResourceRef> {
    let mut seen = std::collections::HashSet::new();
    let mut output = Vec::new();
    for event in events {
        let key = (event.resource_type.clone(), event.resource_id.clone());
        if !seen.insert(key) {
            continue;
        }
        output.push(ResourceRef {
            kind: event.resource_type.clone(),
            id: event.resource_id.clone(),
        });
        if output.len() >= MAX_RESOURCES {
            break;
        }
    }
    output
}

fn counts(events: &[SessionEvent]) -> SessionCounts {
    let mut out = SessionCounts::default();
    for event in events {
        if event.priority.is_empty() {
            continue;
        }
        out.total += 1;
        match event.priority.to_ascii_uppercase().as_str() {
            "P0" => out.p0 += 1,
            "P1" => out.p1 += 1,
            "P2" => out.p2 += 1,
            _ => {}
        }
    }
    out
}

fn format_ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: &str, event_type: &str, priority: &str, app: &str) -> EventRow {
        EventRow {
            ts: ts.into(),
            event_type: event_type.into(),
            priority: priority.into(),
            app: Some(app.into()),
            resource_type: Some("window".into()),
            resource_id: Some("w1".into()),
            payload_json: "{}".into(),
        }
    }

    #[test]
    fn p0_event_closes_the_session() {
        let rows = vec![
            row("2026-07-31T09:00:00Z", "os.window_title_changed", "P2", "chrome"),
            row("2026-07-31T09:00:05Z", "os.file_saved", "P0", "excel"),
            row("2026-07-31T09:00:10Z", "os.window_title_changed", "P2", "chrome"),
        ];
        let events = rows_to_events(&rows);
        let sessions = sessionize(&events, 900);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].len(), 2);
        assert_eq!(sessions[1].len(), 1);
    }

    #[test]
    fn idle_start_closes_and_excludes_itself() {
        let rows = vec![
            row("2026-07-31T09:00:00Z", "os.window_title_changed", "P2", "chrome"),
            row("2026-07-31T09:00:05Z", "os.idle_start", "P2", "chrome"),
            row("2026-07-31T09:00:10Z", "os.window_title_changed", "P2", "chrome"),
        ];
        let events = rows_to_events(&rows);
        let sessions = sessionize(&events, 900);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].len(), 1);
        assert_eq!(sessions[1].len(), 1);
    }

    #[test]
    fn large_gaps_split_sessions() {
        let rows = vec![
            row("2026-07-31T09:00:00Z", "os.window_title_changed", "P2", "chrome"),
            row("2026-07-31T09:30:00Z", "os.window_title_changed", "P2", "chrome"),
        ];
        let events = rows_to_events(&rows);
        let sessions = sessionize(&events, 900);
        assert_eq!(sessions.len(), 2);
    }
}
