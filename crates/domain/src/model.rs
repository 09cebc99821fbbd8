//! Canonical data model shared by the normalizer, privacy guard, priority
//! processor, store, and every derivation tool.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_SCHEMA_VERSION: &str = "1.0";

pub fn is_valid_priority(value: &str) -> bool {
    matches!(value, "P0" | "P1" | "P2")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceRef {
    pub fn unknown() -> Self {
        Self {
            kind: "unknown".into(),
            id: "unknown".into(),
        }
    }
}

impl Default for ResourceRef {
    fn default() -> Self {
        Self::unknown()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyMetadata {
    pub pii_level: String,
    #[serde(default)]
    pub redaction: Vec<String>,
}

impl PrivacyMetadata {
    pub fn unknown() -> Self {
        Self {
            pii_level: "unknown".into(),
            redaction: Vec::new(),
        }
    }
}

/// The canonical inbound + stored unit. `payload` and `raw` are open JSON
/// objects — see SPEC_FULL.md design notes on dynamic payload typing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub schema_version: String,
    pub event_id: String,
    pub ts: String,
    pub source: String,
    pub app: String,
    pub event_type: String,
    pub priority: String,
    pub resource: ResourceRef,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub privacy: PrivacyMetadata,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub window_id: Option<String>,
    #[serde(default)]
    pub raw: Map<String, Value>,
}

impl EventEnvelope {
    pub fn event_type_lower(&self) -> String {
        self.event_type.to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub apps_timeline: Vec<AppTimelineEntry>,
    pub key_events: Vec<String>,
    pub resources: Vec<ResourceRef>,
    pub counts: SessionCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppTimelineEntry {
    pub app: String,
    pub sec: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCounts {
    pub total: usize,
    pub p0: usize,
    pub p1: usize,
    pub p2: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub start_ts: String,
    pub end_ts: String,
    pub duration_sec: i64,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineCandidate {
    pub pattern_id: String,
    pub pattern: Value,
    pub support: i64,
    pub confidence: f64,
    pub last_seen_ts: String,
    pub evidence_session_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandoffStatus {
    Pending,
    Expired,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffQueueRow {
    pub id: i64,
    pub package_id: String,
    pub created_at: String,
    pub status: HandoffStatus,
    pub payload_json: String,
    pub payload_size: i64,
    pub expires_at: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffPackage {
    pub package_id: String,
    pub created_at: String,
    pub version: String,
    pub device_context: Value,
    pub recent_sessions: Vec<Value>,
    pub routine_candidates: Vec<Value>,
    pub signals: Value,
    pub privacy_state: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDetail {
    pub app: String,
    pub title_hash: String,
    pub first_seen_ts: String,
    pub last_seen_ts: String,
    pub total_duration_sec: i64,
    pub blocks: i64,
    pub title_hint: Option<String>,
}
