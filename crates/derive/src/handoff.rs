//! Builds the bounded "handoff" package: a point-in-time snapshot of
//! device context, recent sessions, and routine candidates that a
//! downstream assistant can consume without touching raw event history.
//!
//! [`build_handoff_with_size_guard`] shrinks the package through a
//! series of increasingly aggressive profiles until it fits inside
//! `max_size_bytes`, then runs a final regex scrub over every string
//! value as a last line of defense against leaking emails, file paths,
//! or long numeric IDs.

use chrono::{Duration, Utc};
use collector_privacy::PrivacyRules;
use collector_store::Store;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

pub const DEFAULT_MAX_SIZE_BYTES: usize = 50 * 1024;
pub const DEFAULT_RECENT_SESSIONS: i64 = 3;
pub const DEFAULT_RECENT_ROUTINES: i64 = 10;
pub const DEFAULT_MAX_RESOURCES: usize = 10;
pub const DEFAULT_MAX_EVIDENCE: usize = 5;
pub const DEFAULT_REDACTION_SCAN_LIMIT: i64 = 200;

pub struct HandoffPayload {
    pub payload: Value,
    pub size_bytes: usize,
}

pub struct HandoffOptions {
    pub max_size_bytes: usize,
    pub recent_sessions: i64,
    pub recent_routines: i64,
    pub max_resources: usize,
    pub max_evidence: usize,
    pub redaction_scan_limit: i64,
}

impl Default for HandoffOptions {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            recent_sessions: DEFAULT_RECENT_SESSIONS,
            recent_routines: DEFAULT_RECENT_ROUTINES,
            max_resources: DEFAULT_MAX_RESOURCES,
            max_evidence: DEFAULT_MAX_EVIDENCE,
            redaction_scan_limit: DEFAULT_REDACTION_SCAN_LIMIT,
        }
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap())
}

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z]:\\|/Users/|/home/|\.xlsx|\.docx|\.pptx)").unwrap())
}

fn long_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{12,}\b").unwrap())
}

fn hex64_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-f0-9]{64}$").unwrap())
}

/// Build a handoff payload, shrinking the profile (how many sessions,
/// routines, and resources to include) until the scrubbed JSON fits
/// under `options.max_size_bytes`. Returns the smallest payload tried
/// if even the tightest profile overflows the budget.
pub fn build_handoff_with_size_guard(
    store: &Store,
    rules: &PrivacyRules,
    options: &HandoffOptions,
) -> collector_domain::Result<HandoffPayload> {
    let package_id = uuid::Uuid::new_v4().to_string();
    let created_at = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let profiles: [(i64, i64, usize); 5] = [
        (options.recent_sessions, options.recent_routines, options.max_resources),
        (options.recent_sessions.min(2), options.recent_routines, options.max_resources),
        (1, options.recent_routines.min(5), options.max_resources.min(5)),
        (1, options.recent_routines.min(3), options.max_resources.min(3)),
        (1, 1, 1),
    ];

    let mut last_payload = Value::Null;
    let mut last_size = 0usize;

    for (sessions_limit, routines_limit, resources_limit) in profiles {
        let payload = build_handoff_payload(
            store,
            rules,
            &package_id,
            &created_at,
            sessions_limit,
            routines_limit,
            resources_limit,
            options.max_evidence,
            options.redaction_scan_limit,
        )?;
        let scrubbed = scrub_payload(payload);
        let size_bytes = payload_size(&scrubbed);
        last_payload = scrubbed.clone();
        last_size = size_bytes;
        if size_bytes <= options.max_size_bytes {
            return Ok(HandoffPayload {
                payload: scrubbed,
                size_bytes,
            });
        }
    }

    Ok(HandoffPayload {
        payload: last_payload,
        size_bytes: last_size,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_handoff_payload(
    store: &Store,
    rules: &PrivacyRules,
    package_id: &str,
    created_at: &str,
    sessions_limit: i64,
    routines_limit: i64,
    resources_limit: usize,
    max_evidence: usize,
    redaction_scan_limit: i64,
) -> collector_domain::Result<Value> {
    let device_context = device_context(store, rules)?;
    let last_event_ts = device_context.get("last_event_ts").and_then(|v| v.as_str()).map(str::to_string);
    let recent_sessions = recent_sessions(store, sessions_limit, resources_limit)?;
    let routine_candidates = routine_candidates(store, routines_limit, max_evidence)?;
    let signals = signals(store, last_event_ts.as_deref())?;
    let privacy_state = privacy_state(store, rules, redaction_scan_limit)?;

    Ok(json!({
        "package_id": package_id,
        "created_at": created_at,
        "version": "1.0",
        "device_context": device_context,
        "recent_sessions": recent_sessions,
        "routine_candidates": routine_candidates,
        "signals": signals,
        "privacy_state": privacy_state,
    }))
}

fn device_context(store: &Store, rules: &PrivacyRules) -> collector_domain::Result<Value> {
    let Some(latest) = store.fetch_latest_event()? else {
        return Ok(json!({ "active_app": null, "active_window_hint": null, "last_event_ts": null }));
    };
    let payload: Value = serde_json::from_str(&latest.payload_json).unwrap_or(Value::Null);
    let window_hint = payload
        .get("window_title")
        .and_then(|v| v.as_str())
        .map(|title| sanitize_hint(title, rules));

    Ok(json!({
        "active_app": latest.app,
        "active_window_hint": window_hint,
        "last_event_ts": latest.ts,
        "last_event_type": latest.event_type,
    }))
}

fn signals(store: &Store, last_event_ts: Option<&str>) -> collector_domain::Result<Value> {
    let now = Utc::now();
    let since = (now - Duration::minutes(5)).to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let p0_recent = store.has_recent_p0(&since)?;

    let mut idle_state: Option<bool> = None;
    if last_event_ts.is_some() {
        if let Some(latest) = store.fetch_latest_event()? {
            let event_type = latest.event_type.to_ascii_lowercase();
            if event_type == "os.idle_start" {
                idle_state = Some(true);
            } else if event_type == "os.idle_end" {
                idle_state = Some(false);
            }
        }
    }

    Ok(json!({ "p0_recent": p0_recent, "idle_state": idle_state }))
}

fn privacy_state(store: &Store, rules: &PrivacyRules, redaction_scan_limit: i64) -> collector_domain::Result<Value> {
    let rows = store.fetch_recent_privacy(redaction_scan_limit)?;
    let redaction_summary = redaction_summary(&rows);
    Ok(json!({
        "content_collection": false,
        "denylist_active": !rules.denylist_apps.is_empty(),
        "redaction_summary": redaction_summary,
    }))
}

fn recent_sessions(store: &Store, limit: i64, max_resources: usize) -> collector_domain::Result<Vec<Value>> {
    let rows = store.fetch_recent_sessions(limit)?;
    let mut sessions = Vec::with_capacity(rows.len());
    for row in rows {
        let summary: Value = serde_json::from_str(&row.summary_json).unwrap_or(Value::Null);
        let mut resources = summary.get("resources").cloned().unwrap_or(json!([]));
        if let Value::Array(items) = &mut resources {
            items.truncate(max_resources);
        } else {
            resources = json!([]);
        }
        sessions.push(json!({
            "session_id": row.session_id,
            "start_ts": row.start_ts,
            "end_ts": row.end_ts,
            "duration_sec": row.duration_sec,
            "apps_timeline": summary.get("apps_timeline").cloned().unwrap_or(json!([])),
            "key_events": summary.get("key_events").cloned().unwrap_or(json!([])),
            "resources": resources,
            "counts": summary.get("counts").cloned().unwrap_or(json!({})),
        }));
    }
    Ok(sessions)
}

fn routine_candidates(store: &Store, limit: i64, max_evidence: usize) -> collector_domain::Result<Vec<Value>> {
    let rows = store.fetch_routine_candidates(limit)?;
    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let pattern: Value = serde_json::from_str(&row.pattern_json).unwrap_or(Value::Null);
        let mut evidence: Vec<String> = serde_json::from_str(&row.evidence_session_ids_json).unwrap_or_default();
        if max_evidence > 0 {
            evidence.truncate(max_evidence);
        }
        candidates.push(json!({
            "pattern_id": row.pattern_id,
            "pattern": pattern,
            "support": row.support,
            "confidence": row.confidence,
            "last_seen_ts": row.last_seen_ts,
            "evidence_session_ids": evidence,
        }));
    }
    Ok(candidates)
}

fn redaction_summary(privacy_json_rows: &[String]) -> Value {
    let mut counts: Vec<(String, i64)> = Vec::new();
    let mut total = 0i64;
    for privacy_json in privacy_json_rows {
        let data: Value = serde_json::from_str(privacy_json).unwrap_or(Value::Null);
        let Some(items) = data.get("redaction").and_then(|v| v.as_array()) else {
            continue;
        };
        for item in items {
            let Some(s) = item.as_str() else { continue };
            total += 1;
            match counts.iter_mut().find(|(k, _)| k == s) {
                Some((_, c)) => *c += 1,
                None => counts.push((s.to_string(), 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(10);
    let top: serde_json::Map<String, Value> = counts.into_iter().map(|(k, v)| (k, json!(v))).collect();
    json!({ "total": total, "items": top })
}

fn sanitize_hint(value: &str, rules: &PrivacyRules) -> String {
    let masked = collector_privacy::masking::mask_patterns(value, &rules.redaction_patterns);
    let max_len = rules.length_limits.get("window_title").copied().unwrap_or(64);
    let masked = collector_privacy::masking::truncate(&masked, max_len);
    scrub_string(&masked)
}

fn scrub_payload(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, scrub_payload(v))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(scrub_payload).collect()),
        Value::String(s) => Value::String(scrub_string(&s)),
        other => other,
    }
}

fn scrub_string(value: &str) -> String {
    if hex64_re().is_match(value) {
        return value.to_string();
    }
    if email_re().is_match(value) || path_re().is_match(value) || long_digits_re().is_match(value) {
        return "[REDACTED]".to_string();
    }
    value.to_string()
}

fn payload_size(value: &Value) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_domain::config::EncryptionConfig;
    use collector_domain::model::{EventEnvelope, PrivacyMetadata, ResourceRef};

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.db"), 1000, EncryptionConfig::default()).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_store_produces_a_minimal_payload() {
        let (_dir, store) = store();
        let rules = PrivacyRules::empty();
        let result = build_handoff_with_size_guard(&store, &rules, &HandoffOptions::default()).unwrap();
        assert_eq!(result.payload["device_context"]["active_app"], Value::Null);
    }

    #[test]
    fn scrub_redacts_emails_and_long_digit_runs() {
        assert_eq!(scrub_string("contact me at a@b.com"), "[REDACTED]");
        assert_eq!(scrub_string("account 123456789012"), "[REDACTED]");
        assert_eq!(scrub_string("hello world"), "hello world");
    }

    #[test]
    fn scrub_preserves_64_char_hex_hashes() {
        let hash = "a".repeat(64);
        assert_eq!(scrub_string(&hash), hash);
    }

    #[test]
    fn device_context_reflects_the_latest_event() {
        let (_dir, store) = store();
        let event = EventEnvelope {
            schema_version: "1.0".into(),
            event_id: "evt-1".into(),
            ts: "2026-07-31T12:00:00Z".into(),
            source: "macos".into(),
            app: "outlook".into(),
            event_type: "outlook.compose_started".into(),
            priority: "P1".into(),
            resource: ResourceRef::unknown(),
            payload: Default::default(),
            privacy: PrivacyMetadata::unknown(),
            pid: None,
            window_id: None,
            raw: Default::default(),
        };
        store.insert_event(&event).unwrap();
        let rules = PrivacyRules::empty();
        let result = build_handoff_with_size_guard(&store, &rules, &HandoffOptions::default()).unwrap();
        assert_eq!(result.payload["device_context"]["active_app"], "outlook");
    }
}
