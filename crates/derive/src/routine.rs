//! Mines recurring sequences of key events ("routines") across sessions.
//!
//! A routine candidate is any n-gram of key events that recurs in at
//! least `min_support` distinct sessions. Confidence rewards patterns
//! seen recently and on more than one weekday (a sign of an actual
//! habit rather than a one-off coincidence).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use collector_domain::model::RoutineCandidate;
use collector_store::SessionRow;
use serde_json::json;
use sha2::{Digest, Sha256};

pub struct RoutineSession {
    pub session_id: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub key_events: Vec<String>,
}

pub fn rows_to_sessions(rows: &[SessionRow]) -> Vec<RoutineSession> {
    let mut sessions: Vec<RoutineSession> = rows
        .iter()
        .filter_map(|row| {
            let start_ts = DateTime::parse_from_rfc3339(&row.start_ts).ok()?.with_timezone(&Utc);
            let end_ts = DateTime::parse_from_rfc3339(&row.end_ts).ok()?.with_timezone(&Utc);
            let summary: serde_json::Value = serde_json::from_str(&row.summary_json).ok()?;
            let key_events = summary
                .get("key_events")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str())
                        .map(|s| s.to_ascii_lowercase())
                        .collect()
                })
                .unwrap_or_default();
            Some(RoutineSession {
                session_id: row.session_id.clone(),
                start_ts,
                end_ts,
                key_events,
            })
        })
        .collect();
    sessions.sort_by_key(|s| s.start_ts);
    sessions
}

#[derive(Default)]
struct PatternStats {
    support: i64,
    session_ids: Vec<String>,
    session_id_set: HashSet<String>,
    last_seen: Option<DateTime<Utc>>,
    weekday_counts: HashMap<u32, i64>,
}

pub struct RoutineMiningOptions {
    pub n_min: usize,
    pub n_max: usize,
    pub min_support: i64,
    pub max_patterns: usize,
    pub max_evidence: usize,
}

impl Default for RoutineMiningOptions {
    fn default() -> Self {
        Self {
            n_min: 2,
            n_max: 5,
            min_support: 2,
            max_patterns: 100,
            max_evidence: 10,
        }
    }
}

pub fn build_routine_candidates(sessions: &[RoutineSession], options: &RoutineMiningOptions) -> Vec<RoutineCandidate> {
    if options.max_patterns == 0 {
        return Vec::new();
    }

    let mut stats: HashMap<Vec<String>, PatternStats> = HashMap::new();
    for session in sessions {
        if session.key_events.len() < options.n_min {
            continue;
        }
        let patterns = unique_ngrams(&session.key_events, options.n_min, options.n_max);
        if patterns.is_empty() {
            continue;
        }
        let weekday = session.start_ts.weekday().num_days_from_monday();
        for pattern in patterns {
            let entry = stats.entry(pattern).or_default();
            if entry.session_id_set.contains(&session.session_id) {
                continue;
            }
            entry.session_id_set.insert(session.session_id.clone());
            entry.session_ids.push(session.session_id.clone());
            entry.support += 1;
            *entry.weekday_counts.entry(weekday).or_insert(0) += 1;
            if entry.last_seen.map_or(true, |last| session.end_ts > last) {
                entry.last_seen = Some(session.end_ts);
            }
        }
    }

    let now = Utc::now();
    let mut candidates: Vec<RoutineCandidate> = stats
        .into_iter()
        .filter(|(_, entry)| entry.support >= options.min_support)
        .map(|(pattern, entry)| {
            let last_seen = entry.last_seen.unwrap_or(now);
            let confidence = confidence(entry.support, &entry.weekday_counts, last_seen, now);
            let n = pattern.len();
            let pattern_value = json!({ "type": "ngram", "events": pattern, "n": n });
            let pattern_json = serde_json::to_string(&pattern_value).unwrap_or_default();
            let pattern_id = hash_pattern(&pattern_json);
            let evidence_session_ids = if options.max_evidence > 0 {
                let start = entry.session_ids.len().saturating_sub(options.max_evidence);
                entry.session_ids[start..].to_vec()
            } else {
                Vec::new()
            };

            RoutineCandidate {
                pattern_id,
                pattern: pattern_value,
                support: entry.support,
                confidence,
                last_seen_ts: last_seen.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                evidence_session_ids,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.support
            .cmp(&a.support)
            .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });
    candidates.truncate(options.max_patterns);
    candidates
}

fn unique_ngrams(events: &[String], n_min: usize, n_max: usize) -> HashSet<Vec<String>> {
    if n_min == 0 || n_max < n_min {
        return HashSet::new();
    }
    let limit = n_max.min(events.len());
    let mut output = HashSet::new();
    for n in n_min..=limit {
        if n == 0 || events.len() < n {
            continue;
        }
        for idx in 0..=(events.len() - n) {
            output.insert(events[idx..idx + n].to_vec());
        }
    }
    output
}

fn confidence(support: i64, weekday_counts: &HashMap<u32, i64>, last_seen: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_ago = (now - last_seen).num_days();
    let recency_bonus = if days_ago <= 1 {
        0.3
    } else if days_ago <= 7 {
        0.1
    } else {
        0.0
    };

    let periodicity_bonus = if weekday_counts.values().any(|&c| c >= 2) { 0.1 } else { 0.0 };

    support as f64 * (1.0 + recency_bonus) * (1.0 + periodicity_bonus)
}

fn hash_pattern(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, start: &str, end: &str, key_events: &[&str]) -> RoutineSession {
        RoutineSession {
            session_id: id.into(),
            start_ts: DateTime::parse_from_rfc3339(start).unwrap().with_timezone(&Utc),
            end_ts: DateTime::parse_from_rfc3339(end).unwrap().with_timezone(&Utc),
            key_events: key_events.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn repeated_sequence_becomes_a_candidate() {
        let sessions = vec![
            session(
                "s1",
                "2026-07-30T09:00:00Z",
                "2026-07-30T09:30:00Z",
                &["outlook.compose_started", "excel.refresh_pivot"],
            ),
            session(
                "s2",
                "2026-07-31T09:00:00Z",
                "2026-07-31T09:30:00Z",
                &["outlook.compose_started", "excel.refresh_pivot"],
            ),
        ];
        let candidates = build_routine_candidates(&sessions, &RoutineMiningOptions::default());
        assert!(!candidates.is_empty());
        assert!(candidates.iter().any(|c| c.support == 2));
    }

    #[test]
    fn patterns_below_min_support_are_dropped() {
        let sessions = vec![session(
            "s1",
            "2026-07-30T09:00:00Z",
            "2026-07-30T09:30:00Z",
            &["outlook.compose_started", "excel.refresh_pivot"],
        )];
        let candidates = build_routine_candidates(&sessions, &RoutineMiningOptions::default());
        assert!(candidates.is_empty());
    }

    #[test]
    fn pattern_id_is_stable_for_identical_patterns() {
        assert_eq!(hash_pattern("{\"a\":1}"), hash_pattern("{\"a\":1}"));
        assert_ne!(hash_pattern("{\"a\":1}"), hash_pattern("{\"a\":2}"));
    }
}
