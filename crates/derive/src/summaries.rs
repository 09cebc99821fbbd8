//! Daily and pattern summary aggregation, and the bounded LLM input
//! payload handed to the optional downstream assistant integration.
//!
//! These build on the same session/routine rows the handoff package
//! uses, rolled up to a coarser grain (one day, or one mining window)
//! for the `daily_summaries` / `pattern_summaries` / `llm_inputs` tables.

use collector_store::{RoutineCandidateRow, SessionRow};
use serde_json::{json, Value};

/// Aggregate every session that falls on one local calendar day into a
/// single summary: total active seconds per app, session count, and the
/// union of key events seen that day.
pub fn build_daily_summary(sessions: &[SessionRow]) -> Value {
    let mut app_totals: Vec<(String, i64)> = Vec::new();
    let mut key_events: Vec<String> = Vec::new();
    let mut total_duration_sec = 0i64;

    for session in sessions {
        total_duration_sec += session.duration_sec;
        let summary: Value = serde_json::from_str(&session.summary_json).unwrap_or(Value::Null);
        if let Some(timeline) = summary.get("apps_timeline").and_then(|v| v.as_array()) {
            for entry in timeline {
                let Some(app) = entry.get("app").and_then(|v| v.as_str()) else { continue };
                let sec = entry.get("sec").and_then(|v| v.as_i64()).unwrap_or(0);
                match app_totals.iter_mut().find(|(a, _)| a == app) {
                    Some((_, total)) => *total += sec,
                    None => app_totals.push((app.to_string(), sec)),
                }
            }
        }
        if let Some(events) = summary.get("key_events").and_then(|v| v.as_array()) {
            for event in events {
                if let Some(s) = event.as_str() {
                    if !key_events.iter().any(|e| e == s) {
                        key_events.push(s.to_string());
                    }
                }
            }
        }
    }

    app_totals.sort_by(|a, b| b.1.cmp(&a.1));

    json!({
        "session_count": sessions.len(),
        "total_duration_sec": total_duration_sec,
        "apps_timeline": app_totals.into_iter().map(|(app, sec)| json!({ "app": app, "sec": sec })).collect::<Vec<_>>(),
        "key_events": key_events,
    })
}

/// Summarize the current routine candidates mined over `window_days`
/// into the payload stored in `pattern_summaries`.
pub fn build_pattern_summary(candidates: &[RoutineCandidateRow], window_days: i64) -> Value {
    let patterns: Vec<Value> = candidates
        .iter()
        .map(|c| {
            let pattern: Value = serde_json::from_str(&c.pattern_json).unwrap_or(Value::Null);
            json!({
                "pattern_id": c.pattern_id,
                "pattern": pattern,
                "support": c.support,
                "confidence": c.confidence,
                "last_seen_ts": c.last_seen_ts,
            })
        })
        .collect();

    json!({
        "window_days": window_days,
        "pattern_count": patterns.len(),
        "patterns": patterns,
    })
}

/// Build the bounded payload recorded in `llm_inputs`: a snapshot of
/// recent sessions plus the current pattern summary, small enough to
/// hand to a downstream prompt without re-deriving it from raw events.
pub fn build_llm_input(sessions: &[SessionRow], pattern_summary: &Value) -> Value {
    let sessions_json: Vec<Value> = sessions
        .iter()
        .map(|s| {
            let summary: Value = serde_json::from_str(&s.summary_json).unwrap_or(Value::Null);
            json!({
                "session_id": s.session_id,
                "start_ts": s.start_ts,
                "end_ts": s.end_ts,
                "duration_sec": s.duration_sec,
                "summary": summary,
            })
        })
        .collect();

    json!({
        "recent_sessions": sessions_json,
        "pattern_summary": pattern_summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, duration: i64, summary: Value) -> SessionRow {
        SessionRow {
            session_id: id.into(),
            start_ts: "2026-07-31T09:00:00Z".into(),
            end_ts: "2026-07-31T09:30:00Z".into(),
            duration_sec: duration,
            summary_json: summary.to_string(),
        }
    }

    #[test]
    fn daily_summary_sums_app_durations_across_sessions() {
        let sessions = vec![
            session("s1", 1800, json!({ "apps_timeline": [{"app": "chrome", "sec": 1200}], "key_events": ["a"] })),
            session("s2", 900, json!({ "apps_timeline": [{"app": "chrome", "sec": 300}], "key_events": ["b"] })),
        ];
        let summary = build_daily_summary(&sessions);
        assert_eq!(summary["session_count"], 2);
        assert_eq!(summary["total_duration_sec"], 2700);
        assert_eq!(summary["apps_timeline"][0]["app"], "chrome");
        assert_eq!(summary["apps_timeline"][0]["sec"], 1500);
        assert_eq!(summary["key_events"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn pattern_summary_carries_window_days_through() {
        let candidates = vec![RoutineCandidateRow {
            pattern_id: "p1".into(),
            pattern_json: json!({"events": ["a", "b"]}).to_string(),
            support: 3,
            confidence: 3.3,
            last_seen_ts: "2026-07-31T00:00:00Z".into(),
            evidence_session_ids_json: "[]".into(),
        }];
        let summary = build_pattern_summary(&candidates, 60);
        assert_eq!(summary["window_days"], 60);
        assert_eq!(summary["pattern_count"], 1);
    }
}
