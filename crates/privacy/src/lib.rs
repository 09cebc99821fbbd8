//! Privacy enforcement applied to every event before it is persisted.
//!
//! [`PrivacyGuard::apply`] hashes identifiers, sanitizes URLs, masks
//! sensitive substrings, truncates oversized fields, and can drop or
//! strip events from denylisted apps entirely, based on a [`PrivacyRules`]
//! document loaded from disk.

pub mod hashing;
pub mod masking;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use collector_domain::model::{EventEnvelope, PrivacyMetadata, ResourceRef};
use collector_domain::{Error, Result};
use regex::Regex;
use serde::Deserialize;

/// Payload keys that are never stored verbatim: any value under one of
/// these is replaced with a `{count, domain_stats?}` summary, regardless
/// of `mask_keys`/`hash_keys` configuration.
const RECIPIENT_KEYS: [&str; 7] = ["recipients", "recipient", "to", "cc", "bcc", "email", "emails"];

fn recipient_email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap())
}

#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    pub allow_full_url: bool,
    pub keep_domain_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PrivacyRules {
    pub mask_keys: HashSet<String>,
    pub hash_keys: HashSet<String>,
    pub length_limits: HashMap<String, usize>,
    pub url_policy: UrlPolicy,
    pub redaction_patterns: Vec<Regex>,
    pub drop_payload_keys: HashSet<String>,
    pub allowlist_apps: HashSet<String>,
    pub denylist_apps: HashSet<String>,
    pub denylist_action: String,
}

impl PrivacyRules {
    pub fn empty() -> Self {
        Self {
            denylist_action: "drop".into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawUrlPolicy {
    #[serde(default)]
    allow_full_url: bool,
    #[serde(default = "default_true")]
    keep_domain_only: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Default)]
struct RawRedactionPattern {
    regex: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(untagged)]
enum RawPattern {
    Plain(String),
    Detailed(RawRedactionPattern),
    #[default]
    Empty,
}

#[derive(Debug, Deserialize, Default)]
struct RawPrivacyRules {
    #[serde(default)]
    mask_keys: Vec<String>,
    #[serde(default)]
    hash_keys: Vec<String>,
    #[serde(default)]
    drop_payload_keys: Vec<String>,
    #[serde(default)]
    allowlist_apps: Vec<String>,
    #[serde(default)]
    denylist_apps: Vec<String>,
    #[serde(default = "default_denylist_action")]
    denylist_action: String,
    #[serde(default)]
    length_limits: HashMap<String, usize>,
    #[serde(default)]
    url_policy: RawUrlPolicy,
    #[serde(default)]
    redaction_patterns: Vec<RawPattern>,
}

fn default_denylist_action() -> String {
    "drop".into()
}

/// Load a [`PrivacyRules`] document from a TOML file on disk.
pub fn load_privacy_rules(path: impl AsRef<Path>) -> Result<PrivacyRules> {
    let path = path.as_ref();
    let raw_text = std::fs::read_to_string(path)?;
    let raw: RawPrivacyRules = toml::from_str(&raw_text)
        .map_err(|e| Error::PrivacyRules(format!("parsing {}: {e}", path.display())))?;

    let mut redaction_patterns = Vec::new();
    for pattern in raw.redaction_patterns {
        let regex_src = match pattern {
            RawPattern::Plain(s) => Some(s),
            RawPattern::Detailed(d) => d.regex,
            RawPattern::Empty => None,
        };
        if let Some(src) = regex_src {
            let compiled = Regex::new(&src)
                .map_err(|e| Error::PrivacyRules(format!("invalid redaction pattern {src:?}: {e}")))?;
            redaction_patterns.push(compiled);
        }
    }

    Ok(PrivacyRules {
        mask_keys: lower_set(raw.mask_keys),
        hash_keys: lower_set(raw.hash_keys),
        length_limits: raw
            .length_limits
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect(),
        url_policy: UrlPolicy {
            allow_full_url: raw.url_policy.allow_full_url,
            keep_domain_only: raw.url_policy.keep_domain_only,
        },
        redaction_patterns,
        drop_payload_keys: lower_set(raw.drop_payload_keys),
        allowlist_apps: lower_set(raw.allowlist_apps),
        denylist_apps: lower_set(raw.denylist_apps),
        denylist_action: raw.denylist_action.to_ascii_lowercase(),
    })
}

fn lower_set(values: Vec<String>) -> HashSet<String> {
    values.into_iter().map(|v| v.to_ascii_lowercase()).collect()
}

/// Applies [`PrivacyRules`] to inbound events. One guard per running
/// collector, shared across the normalizer and ingest pipeline.
pub struct PrivacyGuard {
    rules: PrivacyRules,
    hash_salt: String,
}

impl PrivacyGuard {
    pub fn new(rules: PrivacyRules, hash_salt: String) -> Self {
        Self { rules, hash_salt }
    }

    /// Apply the rules to `envelope`, returning `None` if the event should
    /// be dropped entirely (denylisted app, or not in a configured
    /// allowlist).
    pub fn apply(&self, mut envelope: EventEnvelope) -> Option<EventEnvelope> {
        let app_key = envelope.app.to_ascii_lowercase();

        if !self.rules.allowlist_apps.is_empty() && !self.rules.allowlist_apps.contains(&app_key) {
            return None;
        }
        if self.rules.denylist_apps.contains(&app_key) {
            if self.rules.denylist_action == "strip" {
                envelope.payload.clear();
                let mut redaction = envelope.privacy.redaction;
                push_unique(&mut redaction, "denylist_stripped");
                envelope.privacy = PrivacyMetadata {
                    pii_level: envelope.privacy.pii_level,
                    redaction,
                };
                return Some(envelope);
            }
            return None;
        }

        let mut redactions = envelope.privacy.redaction.clone();

        if let Some(window_id) = envelope.window_id.take() {
            envelope.window_id = Some(hashing::hmac_sha256(&window_id, &self.hash_salt));
            push_unique(&mut redactions, "window_id_hashed");
        }

        if envelope.resource.id != "unknown" {
            let hashed_id = hashing::hmac_sha256(&envelope.resource.id, &self.hash_salt);
            envelope.resource = ResourceRef {
                kind: envelope.resource.kind,
                id: hashed_id,
            };
            push_unique(&mut redactions, "resource_id_hashed");
        }

        let mut sanitized = serde_json::Map::new();
        for (key, value) in envelope.payload {
            let key_norm = key.to_ascii_lowercase();
            if self.rules.drop_payload_keys.contains(&key_norm) {
                push_unique(&mut redactions, &format!("drop:{key_norm}"));
                continue;
            }
            let sanitized_value = self.sanitize_payload_value(&key_norm, value, &mut redactions);
            sanitized.insert(key, sanitized_value);
        }
        envelope.payload = sanitized;

        let pii_level = envelope.privacy.pii_level;
        dedupe(&mut redactions);
        envelope.privacy = PrivacyMetadata {
            pii_level,
            redaction: redactions,
        };

        Some(envelope)
    }

    fn sanitize_payload_value(
        &self,
        key_norm: &str,
        value: serde_json::Value,
        redactions: &mut Vec<String>,
    ) -> serde_json::Value {
        if RECIPIENT_KEYS.contains(&key_norm) {
            push_unique(redactions, &format!("recipients_summarized:{key_norm}"));
            return summarize_recipients(&value);
        }

        if self.rules.hash_keys.contains(key_norm) {
            push_unique(redactions, &format!("hash:{key_norm}"));
            let as_str = value_to_string(&value);
            return serde_json::Value::String(hashing::hmac_sha256(&as_str, &self.hash_salt));
        }

        let serde_json::Value::String(mut s) = value else {
            return value;
        };

        if key_norm == "url" && !self.rules.url_policy.allow_full_url {
            s = masking::sanitize_url(&s, self.rules.url_policy.keep_domain_only);
            push_unique(redactions, "url_sanitized");
        }

        if self.rules.mask_keys.contains(key_norm) {
            s = masking::mask_patterns(&s, &self.rules.redaction_patterns);
            push_unique(redactions, &format!("mask:{key_norm}"));
        }

        if let Some(&max_len) = self.rules.length_limits.get(key_norm) {
            s = masking::truncate(&s, max_len);
        }

        serde_json::Value::String(s)
    }
}

/// Replace a recipient-shaped payload value with a `{count, domain_stats}`
/// summary. Falls back to a structural count (array length, or 1 for a
/// scalar) when no addresses can be extracted, so no raw address ever
/// survives regardless of the value's shape.
fn summarize_recipients(value: &serde_json::Value) -> serde_json::Value {
    let emails = extract_emails(value);
    if emails.is_empty() {
        return serde_json::json!({ "count": structural_count(value) });
    }
    let mut domain_stats: HashMap<String, u64> = HashMap::new();
    for email in &emails {
        if let Some((_, domain)) = email.rsplit_once('@') {
            *domain_stats.entry(domain.to_ascii_lowercase()).or_insert(0) += 1;
        }
    }
    serde_json::json!({ "count": emails.len(), "domain_stats": domain_stats })
}

fn extract_emails(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => recipient_email_re().find_iter(s).map(|m| m.as_str().to_string()).collect(),
        serde_json::Value::Array(items) => items.iter().flat_map(extract_emails).collect(),
        serde_json::Value::Object(map) => map.values().flat_map(extract_emails).collect(),
        _ => Vec::new(),
    }
}

fn structural_count(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => items.len(),
        serde_json::Value::Null => 0,
        _ => 1,
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_unique(values: &mut Vec<String>, item: &str) {
    if !values.iter().any(|v| v == item) {
        values.push(item.to_string());
    }
}

fn dedupe(values: &mut Vec<String>) {
    let mut seen = HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_domain::model::ResourceRef;
    use serde_json::json;

    fn sample_envelope() -> EventEnvelope {
        EventEnvelope {
            schema_version: "1.0".into(),
            event_id: "evt-1".into(),
            ts: "2026-07-31T12:00:00Z".into(),
            source: "macos".into(),
            app: "Chrome".into(),
            event_type: "browser.tab_changed".into(),
            priority: "P1".into(),
            resource: ResourceRef {
                kind: "window".into(),
                id: "win-42".into(),
            },
            payload: serde_json::Map::from_iter([("url".into(), json!("https://mail.example.com/inbox"))]),
            privacy: PrivacyMetadata::unknown(),
            pid: Some(123),
            window_id: Some("w-1".into()),
            raw: Default::default(),
        }
    }

    #[test]
    fn hashes_window_id_and_resource_id() {
        let guard = PrivacyGuard::new(PrivacyRules::empty(), "salt".into());
        let out = guard.apply(sample_envelope()).unwrap();
        assert_ne!(out.window_id.unwrap(), "w-1");
        assert_ne!(out.resource.id, "win-42");
    }

    #[test]
    fn sanitizes_url_payload_field_by_default_policy() {
        let mut rules = PrivacyRules::empty();
        rules.url_policy.keep_domain_only = true;
        let guard = PrivacyGuard::new(rules, "salt".into());
        let out = guard.apply(sample_envelope()).unwrap();
        assert_eq!(out.payload.get("url").unwrap(), "mail.example.com");
        assert!(out.privacy.redaction.contains(&"url_sanitized".to_string()));
    }

    #[test]
    fn denylisted_app_is_dropped() {
        let mut rules = PrivacyRules::empty();
        rules.denylist_apps.insert("chrome".into());
        let guard = PrivacyGuard::new(rules, "salt".into());
        assert!(guard.apply(sample_envelope()).is_none());
    }

    #[test]
    fn denylisted_app_with_strip_action_keeps_event_without_payload() {
        let mut rules = PrivacyRules::empty();
        rules.denylist_apps.insert("chrome".into());
        rules.denylist_action = "strip".into();
        let guard = PrivacyGuard::new(rules, "salt".into());
        let out = guard.apply(sample_envelope()).unwrap();
        assert!(out.payload.is_empty());
        assert!(out.privacy.redaction.contains(&"denylist_stripped".to_string()));
    }

    #[test]
    fn allowlist_excludes_apps_not_listed() {
        let mut rules = PrivacyRules::empty();
        rules.allowlist_apps.insert("outlook".into());
        let guard = PrivacyGuard::new(rules, "salt".into());
        assert!(guard.apply(sample_envelope()).is_none());
    }

    #[test]
    fn recipients_are_replaced_with_a_count_and_domain_summary() {
        let mut envelope = sample_envelope();
        envelope.payload = serde_json::Map::from_iter([(
            "recipients".into(),
            json!(["a@x.com", "b@x.com", "c@y.com"]),
        )]);
        let guard = PrivacyGuard::new(PrivacyRules::empty(), "salt".into());
        let out = guard.apply(envelope).unwrap();
        let recipients = out.payload.get("recipients").unwrap();
        assert_eq!(recipients["count"], json!(3));
        assert_eq!(recipients["domain_stats"]["x.com"], json!(2));
        assert_eq!(recipients["domain_stats"]["y.com"], json!(1));
        assert!(out.privacy.redaction.contains(&"recipients_summarized:recipients".to_string()));
        assert!(!serde_json::to_string(&out.payload).unwrap().contains("@x.com"));
    }

    #[test]
    fn recipient_key_with_no_parseable_email_falls_back_to_structural_count() {
        let mut envelope = sample_envelope();
        envelope.payload = serde_json::Map::from_iter([("to".into(), json!(["alice", "bob"]))]);
        let guard = PrivacyGuard::new(PrivacyRules::empty(), "salt".into());
        let out = guard.apply(envelope).unwrap();
        assert_eq!(out.payload.get("to").unwrap()["count"], json!(2));
    }

    #[test]
    fn load_privacy_rules_parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("privacy.toml");
        std::fs::write(
            &path,
            r#"
            mask_keys = ["title"]
            hash_keys = ["participant"]
            denylist_apps = ["1password"]
            denylist_action = "drop"

            [url_policy]
            keep_domain_only = true

            [[redaction_patterns]]
            regex = "[0-9]{12,}"
            "#,
        )
        .unwrap();

        let rules = load_privacy_rules(&path).unwrap();
        assert!(rules.mask_keys.contains("title"));
        assert!(rules.hash_keys.contains("participant"));
        assert_eq!(rules.redaction_patterns.len(), 1);
    }
}
