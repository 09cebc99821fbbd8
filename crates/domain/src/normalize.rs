//! Turns an arbitrary JSON mapping from an untrusted sensor into a
//! canonical [`EventEnvelope`].

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::model::{is_valid_priority, EventEnvelope, PrivacyMetadata, ResourceRef, DEFAULT_SCHEMA_VERSION};
use crate::{Error, Result};

/// How strictly [`normalize`] treats a malformed inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Missing required fields are filled with safe defaults.
    Lenient,
    /// Any missing or ill-typed required field fails with a schema error.
    Strict,
}

impl ValidationMode {
    pub fn from_config_str(s: &str) -> Self {
        match s {
            "strict" => ValidationMode::Strict,
            _ => ValidationMode::Lenient,
        }
    }
}

/// Normalize a raw JSON object into a canonical [`EventEnvelope`].
///
/// `raw` must be a JSON object; callers that accept a `POST /events` array
/// split it into individual objects before calling this.
pub fn normalize(raw: &Value, mode: ValidationMode) -> Result<EventEnvelope> {
    let obj = raw
        .as_object()
        .ok_or_else(|| Error::schema("non_object", "root"))?;

    let schema_version = normalize_schema_version(obj, mode)?;
    if is_forward_version(&schema_version) {
        ensure_required_fields_present(obj)?;
    }
    let event_id = normalize_event_id(obj, mode)?;
    let ts = normalize_ts(obj, mode)?;
    let source = normalize_string(obj, "source", mode, "unknown")?;
    let app = normalize_string(obj, "app", mode, "unknown")?;
    let event_type = normalize_string(obj, "event_type", mode, "unknown")?;
    let priority = normalize_priority(obj, mode)?;
    let resource = normalize_resource(obj, mode)?;
    let payload = normalize_payload(obj, mode)?;
    let privacy = normalize_privacy(obj);
    let pid = obj.get("pid").and_then(|v| v.as_i64());
    let window_id = obj
        .get("window_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(EventEnvelope {
        schema_version,
        event_id,
        ts,
        source,
        app,
        event_type,
        priority,
        resource,
        payload,
        privacy,
        pid,
        window_id,
        raw: obj.clone(),
    })
}

fn normalize_schema_version(obj: &Map<String, Value>, mode: ValidationMode) -> Result<String> {
    match obj.get("schema_version").and_then(|v| v.as_str()) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) | None => match mode {
            ValidationMode::Strict if obj.contains_key("schema_version") => {
                Err(Error::schema("invalid_type", "schema_version"))
            }
            _ => Ok(DEFAULT_SCHEMA_VERSION.to_string()),
        },
    }
}

/// Parse a `"major.minor"`-shaped version string into a comparable tuple.
fn parse_version(v: &str) -> Option<(u32, u32)> {
    let mut parts = v.split('.');
    let major = parts.next()?.parse::<u32>().ok()?;
    let minor = parts.next().unwrap_or("0").parse::<u32>().ok()?;
    Some((major, minor))
}

/// Whether `version` is numerically newer than the schema version this
/// implementation understands.
fn is_forward_version(version: &str) -> bool {
    match (parse_version(version), parse_version(DEFAULT_SCHEMA_VERSION)) {
        (Some(v), Some(max)) => v > max,
        _ => false,
    }
}

/// A forward-version event is accepted, but only when it explicitly
/// carries every required field itself — lenient default-filling is not
/// trusted to guess at a schema this implementation doesn't know yet.
fn ensure_required_fields_present(obj: &Map<String, Value>) -> Result<()> {
    let present = |field: &str| {
        obj.get(field)
            .and_then(|v| v.as_str())
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    };
    for field in ["event_id", "ts", "source", "app", "event_type"] {
        if !present(field) {
            return Err(Error::schema("missing_for_forward_version", field));
        }
    }
    let resource_ok = obj
        .get("resource")
        .and_then(|v| v.as_object())
        .map(|r| {
            let kind = r.get("type").and_then(|v| v.as_str()).map(|s| !s.is_empty()).unwrap_or(false);
            let id = r.get("id").and_then(|v| v.as_str()).map(|s| !s.is_empty()).unwrap_or(false);
            kind && id
        })
        .unwrap_or(false);
    if !resource_ok {
        return Err(Error::schema("missing_for_forward_version", "resource"));
    }
    Ok(())
}

fn normalize_event_id(obj: &Map<String, Value>, mode: ValidationMode) -> Result<String> {
    match obj.get("event_id").and_then(|v| v.as_str()) {
        Some(s) if Uuid::parse_str(s).is_ok() => Ok(s.to_string()),
        Some(_) => match mode {
            ValidationMode::Strict => Err(Error::schema("invalid_uuid", "event_id")),
            ValidationMode::Lenient => Ok(Uuid::new_v4().to_string()),
        },
        None => match mode {
            ValidationMode::Strict => Err(Error::schema("missing", "event_id")),
            ValidationMode::Lenient => Ok(Uuid::new_v4().to_string()),
        },
    }
}

fn normalize_ts(obj: &Map<String, Value>, mode: ValidationMode) -> Result<String> {
    if let Some(s) = obj.get("ts").and_then(|v| v.as_str()) {
        return match chrono::DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Ok(dt.with_timezone(&Utc).to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            Err(_) => match mode {
                ValidationMode::Strict => Err(Error::schema("invalid_timestamp", "ts")),
                ValidationMode::Lenient => Ok(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            },
        };
    }

    if let Some(n) = obj.get("ts").and_then(|v| v.as_f64()) {
        if mode == ValidationMode::Lenient {
            let secs = n.trunc() as i64;
            let nanos = ((n.fract()) * 1_000_000_000.0) as u32;
            if let Some(dt) = chrono::DateTime::from_timestamp(secs, nanos) {
                return Ok(dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
            }
        }
    }

    match mode {
        ValidationMode::Strict => Err(Error::schema("missing", "ts")),
        ValidationMode::Lenient => Ok(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
    }
}

fn normalize_string(
    obj: &Map<String, Value>,
    field: &str,
    mode: ValidationMode,
    default: &str,
) -> Result<String> {
    match obj.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => match mode {
            ValidationMode::Strict => Err(Error::schema("missing", field)),
            ValidationMode::Lenient => Ok(default.to_string()),
        },
    }
}

fn normalize_priority(obj: &Map<String, Value>, mode: ValidationMode) -> Result<String> {
    match obj.get("priority").and_then(|v| v.as_str()) {
        Some(p) if is_valid_priority(p) => Ok(p.to_string()),
        Some(_) => match mode {
            ValidationMode::Strict => Err(Error::schema("invalid_priority", "priority")),
            ValidationMode::Lenient => Ok("P1".to_string()),
        },
        None => match mode {
            ValidationMode::Strict => Err(Error::schema("missing", "priority")),
            ValidationMode::Lenient => Ok("P1".to_string()),
        },
    }
}

fn normalize_resource(obj: &Map<String, Value>, mode: ValidationMode) -> Result<ResourceRef> {
    match obj.get("resource").and_then(|v| v.as_object()) {
        Some(r) => {
            let kind = r.get("type").and_then(|v| v.as_str()).unwrap_or("");
            let id = r.get("id").and_then(|v| v.as_str()).unwrap_or("");
            if kind.is_empty() || id.is_empty() {
                match mode {
                    ValidationMode::Strict => Err(Error::schema("invalid_resource", "resource")),
                    ValidationMode::Lenient => Ok(ResourceRef::unknown()),
                }
            } else {
                Ok(ResourceRef {
                    kind: kind.to_string(),
                    id: id.to_string(),
                })
            }
        }
        None => match mode {
            ValidationMode::Strict => Err(Error::schema("missing", "resource")),
            ValidationMode::Lenient => Ok(ResourceRef::unknown()),
        },
    }
}

fn normalize_payload(obj: &Map<String, Value>, mode: ValidationMode) -> Result<Map<String, Value>> {
    match obj.get("payload") {
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(_) => match mode {
            ValidationMode::Strict => Err(Error::schema("invalid_type", "payload")),
            ValidationMode::Lenient => Ok(Map::new()),
        },
        None => Ok(Map::new()),
    }
}

fn normalize_privacy(obj: &Map<String, Value>) -> PrivacyMetadata {
    match obj.get("privacy").and_then(|v| v.as_object()) {
        Some(p) => PrivacyMetadata {
            pii_level: p
                .get("pii_level")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            redaction: p
                .get("redaction")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
        },
        None => PrivacyMetadata::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_mode_fills_in_missing_fields() {
        let raw = json!({ "event_type": "os.foreground_changed" });
        let env = normalize(&raw, ValidationMode::Lenient).unwrap();
        assert_eq!(env.priority, "P1");
        assert_eq!(env.source, "unknown");
        assert!(Uuid::parse_str(&env.event_id).is_ok());
    }

    #[test]
    fn strict_mode_rejects_missing_required_fields() {
        let raw = json!({ "event_type": "os.foreground_changed" });
        let err = normalize(&raw, ValidationMode::Strict).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn unknown_priority_defaults_to_p1_in_lenient_mode() {
        let raw = json!({ "priority": "P9", "event_type": "x" });
        let env = normalize(&raw, ValidationMode::Lenient).unwrap();
        assert_eq!(env.priority, "P1");
    }

    #[test]
    fn numeric_epoch_timestamp_is_accepted_in_lenient_mode() {
        let raw = json!({ "event_type": "x", "ts": 1_700_000_000 });
        let env = normalize(&raw, ValidationMode::Lenient).unwrap();
        assert!(env.ts.ends_with('Z'));
    }

    #[test]
    fn forward_schema_version_requires_explicit_required_fields_even_in_lenient_mode() {
        let raw = json!({ "schema_version": "2.0", "event_type": "x" });
        let err = normalize(&raw, ValidationMode::Lenient).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn forward_schema_version_is_accepted_once_required_fields_are_present() {
        let raw = json!({
            "schema_version": "2.0",
            "event_id": Uuid::new_v4().to_string(),
            "ts": "2026-07-31T12:00:00Z",
            "source": "os",
            "app": "Chrome",
            "event_type": "os.app_focus_block",
            "resource": { "type": "window", "id": "w-1" },
        });
        let env = normalize(&raw, ValidationMode::Lenient).unwrap();
        assert_eq!(env.schema_version, "2.0");
    }

    #[test]
    fn non_object_root_is_a_schema_error() {
        let raw = json!(["not", "an", "object"]);
        let err = normalize(&raw, ValidationMode::Lenient).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }
}
