//! SQLite-backed persistence for collected events, derived sessions,
//! routine candidates, handoff packages, and periodic summaries.
//!
//! [`Store`] owns a single `rusqlite::Connection` behind a
//! `parking_lot::Mutex` — SQLite allows one writer at a time, and
//! `rusqlite::Connection` is `Send` but not `Sync`, so every access goes
//! through the lock rather than a pool.

mod crypto;

use std::path::{Path, PathBuf};
use std::time::Duration;

use collector_domain::config::EncryptionConfig;
use collector_domain::model::{ActivityDetail, EventEnvelope, HandoffQueueRow, HandoffStatus, RoutineCandidate};
use collector_domain::{Error, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init.sql",
    include_str!("migrations/0001_init.sql"),
)];

pub struct Store {
    db_path: PathBuf,
    conn: Mutex<Connection>,
    encryption: EncryptionConfig,
    enc_key: Option<[u8; 32]>,
}

impl Store {
    /// Open (creating if necessary) the database at `db_path`, apply WAL
    /// mode and the configured busy timeout, and run all migrations.
    pub fn open(db_path: impl AsRef<Path>, busy_timeout_ms: u64, encryption: EncryptionConfig) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::Store(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| Error::Store(e.to_string()))?;
        if busy_timeout_ms > 0 {
            conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
                .map_err(|e| Error::Store(e.to_string()))?;
        }
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| Error::Store(e.to_string()))?;

        let enc_key = if encryption.enabled {
            crypto::load_key(&encryption.key_env, &encryption.key_path)
        } else {
            None
        };

        let store = Self {
            db_path,
            conn: Mutex::new(conn),
            encryption,
            enc_key,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        for (_name, sql) in MIGRATIONS {
            conn.execute_batch(sql).map_err(|e| Error::Store(e.to_string()))?;
        }
        Ok(())
    }

    pub fn insert_event(&self, envelope: &EventEnvelope) -> Result<()> {
        self.insert_events(std::slice::from_ref(envelope), 3, 50)
    }

    /// Insert a batch of events in one transaction, retrying on
    /// `SQLITE_BUSY` with exponential backoff.
    pub fn insert_events(
        &self,
        envelopes: &[EventEnvelope],
        retry_attempts: u32,
        retry_backoff_ms: u64,
    ) -> Result<()> {
        if envelopes.is_empty() {
            return Ok(());
        }

        let mut rows = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let payload_json = serde_json::to_string(&envelope.payload)?;
            let privacy_json = serde_json::to_string(&envelope.privacy)?;
            let raw_json = serde_json::to_string(&envelope.raw)?;
            let raw_json = if self.encryption.enabled && self.encryption.encrypt_raw_json {
                let key = self.enc_key.ok_or_else(|| {
                    Error::Encryption(format!(
                        "encryption enabled but key missing: set {}",
                        self.encryption.key_env
                    ))
                })?;
                crypto::encrypt_text(&raw_json, &key)?
            } else {
                raw_json
            };
            rows.push((envelope, payload_json, privacy_json, raw_json));
        }

        for attempt in 0..=retry_attempts {
            let conn = self.conn.lock();
            let result = (|| -> rusqlite::Result<()> {
                let mut stmt = conn.prepare_cached(
                    "INSERT INTO events (
                        schema_version, event_id, ts, source, app, event_type, priority,
                        resource_type, resource_id, payload_json, privacy_json, pid, window_id, raw_json
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                )?;
                for (envelope, payload_json, privacy_json, raw_json) in &rows {
                    stmt.execute(params![
                        envelope.schema_version,
                        envelope.event_id,
                        envelope.ts,
                        envelope.source,
                        envelope.app,
                        envelope.event_type,
                        envelope.priority,
                        envelope.resource.kind,
                        envelope.resource.id,
                        payload_json,
                        privacy_json,
                        envelope.pid,
                        envelope.window_id,
                        raw_json,
                    ])?;
                }
                Ok(())
            })();

            match result {
                Ok(()) => return Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::DatabaseBusy && attempt < retry_attempts =>
                {
                    drop(conn);
                    let sleep_for = Duration::from_millis(retry_backoff_ms * 2u64.pow(attempt));
                    std::thread::sleep(sleep_for);
                }
                Err(e) => return Err(Error::StoreBusy(e.to_string())),
            }
        }
        Ok(())
    }

    pub fn upsert_activity_details(&self, records: &[ActivityDetail]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "INSERT INTO activity_details (
                    app, title_hash, title_hint, first_seen_ts, last_seen_ts, total_duration_sec, blocks
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
                ON CONFLICT(app, title_hash) DO UPDATE SET
                    last_seen_ts = excluded.last_seen_ts,
                    total_duration_sec = activity_details.total_duration_sec + excluded.total_duration_sec,
                    blocks = activity_details.blocks + 1,
                    title_hint = CASE
                        WHEN activity_details.title_hint IS NULL OR activity_details.title_hint = ''
                        THEN excluded.title_hint
                        ELSE activity_details.title_hint
                    END",
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        for record in records {
            stmt.execute(params![
                record.app,
                record.title_hash,
                record.title_hint,
                record.first_seen_ts,
                record.last_seen_ts,
                record.total_duration_sec,
            ])
            .map_err(|e| Error::Store(e.to_string()))?;
        }
        Ok(())
    }

    pub fn insert_session(
        &self,
        session_id: &str,
        start_ts: &str,
        end_ts: &str,
        duration_sec: i64,
        summary_json: &str,
    ) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO sessions (session_id, start_ts, end_ts, duration_sec, summary_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, start_ts, end_ts, duration_sec, summary_json],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn clear_routine_candidates(&self) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM routine_candidates", [])
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn insert_routine_candidate(&self, candidate: &RoutineCandidate) -> Result<()> {
        let pattern_json = serde_json::to_string(&candidate.pattern)?;
        let evidence_json = serde_json::to_string(&candidate.evidence_session_ids)?;
        self.conn
            .lock()
            .execute(
                "INSERT INTO routine_candidates (
                    pattern_id, pattern_json, support, confidence, last_seen_ts, evidence_session_ids
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    candidate.pattern_id,
                    pattern_json,
                    candidate.support,
                    candidate.confidence,
                    candidate.last_seen_ts,
                    evidence_json,
                ],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn upsert_daily_summary(
        &self,
        date_local: &str,
        start_utc: &str,
        end_utc: &str,
        payload_json: &str,
        created_at: &str,
    ) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO daily_summaries (date_local, start_utc, end_utc, payload_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(date_local) DO UPDATE SET
                     payload_json = excluded.payload_json,
                     start_utc = excluded.start_utc,
                     end_utc = excluded.end_utc,
                     created_at = excluded.created_at",
                params![date_local, start_utc, end_utc, payload_json, created_at],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn insert_pattern_summary(&self, created_at: &str, window_days: i64, payload_json: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO pattern_summaries (created_at, window_days, payload_json) VALUES (?1, ?2, ?3)",
                params![created_at, window_days, payload_json],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn insert_llm_input(&self, created_at: &str, payload_json: &str, payload_size: i64) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO llm_inputs (created_at, payload_json, payload_size) VALUES (?1, ?2, ?3)",
                params![created_at, payload_json, payload_size],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn fetch_events(&self, start_ts: Option<&str>, end_ts: Option<&str>) -> Result<Vec<EventRow>> {
        let conn = self.conn.lock();
        let mut query = String::from(
            "SELECT ts, event_type, priority, app, resource_type, resource_id, payload_json FROM events",
        );
        let mut clauses = Vec::new();
        if start_ts.is_some() {
            clauses.push("ts >= ?");
        }
        if end_ts.is_some() {
            clauses.push("ts <= ?");
        }
        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }
        query.push_str(" ORDER BY ts ASC");

        let mut stmt = conn.prepare(&query).map_err(|e| Error::Store(e.to_string()))?;
        let mut bind: Vec<&dyn rusqlite::ToSql> = Vec::new();
        if let Some(s) = &start_ts {
            bind.push(s);
        }
        if let Some(e) = &end_ts {
            bind.push(e);
        }
        let rows = stmt
            .query_map(bind.as_slice(), |row| {
                Ok(EventRow {
                    ts: row.get(0)?,
                    event_type: row.get(1)?,
                    priority: row.get(2)?,
                    app: row.get(3)?,
                    resource_type: row.get(4)?,
                    resource_id: row.get(5)?,
                    payload_json: row.get(6)?,
                })
            })
            .map_err(|e| Error::Store(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn fetch_latest_event(&self) -> Result<Option<LatestEventRow>> {
        self.conn
            .lock()
            .query_row(
                "SELECT ts, event_type, priority, app, payload_json FROM events ORDER BY ts DESC LIMIT 1",
                [],
                |row| {
                    Ok(LatestEventRow {
                        ts: row.get(0)?,
                        event_type: row.get(1)?,
                        priority: row.get(2)?,
                        app: row.get(3)?,
                        payload_json: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn fetch_recent_privacy(&self, limit: i64) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT privacy_json FROM events ORDER BY ts DESC LIMIT ?1")
            .map_err(|e| Error::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Store(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn fetch_recent_sessions(&self, limit: i64) -> Result<Vec<SessionRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT session_id, start_ts, end_ts, duration_sec, summary_json
                 FROM sessions ORDER BY start_ts DESC LIMIT ?1",
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(SessionRow {
                    session_id: row.get(0)?,
                    start_ts: row.get(1)?,
                    end_ts: row.get(2)?,
                    duration_sec: row.get(3)?,
                    summary_json: row.get(4)?,
                })
            })
            .map_err(|e| Error::Store(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn fetch_routine_candidates(&self, limit: i64) -> Result<Vec<RoutineCandidateRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT pattern_id, pattern_json, support, confidence, last_seen_ts, evidence_session_ids
                 FROM routine_candidates ORDER BY support DESC, confidence DESC LIMIT ?1",
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(RoutineCandidateRow {
                    pattern_id: row.get(0)?,
                    pattern_json: row.get(1)?,
                    support: row.get(2)?,
                    confidence: row.get(3)?,
                    last_seen_ts: row.get(4)?,
                    evidence_session_ids_json: row.get(5)?,
                })
            })
            .map_err(|e| Error::Store(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn fetch_latest_session_end_ts(&self) -> Result<Option<String>> {
        self.conn
            .lock()
            .query_row(
                "SELECT end_ts FROM sessions ORDER BY end_ts DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn has_recent_p0(&self, since_ts: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .lock()
            .query_row(
                "SELECT 1 FROM events WHERE priority = 'P0' AND ts >= ?1 LIMIT 1",
                params![since_ts],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(found.is_some())
    }

    pub fn enqueue_handoff(
        &self,
        package_id: &str,
        created_at: &str,
        status: HandoffStatus,
        payload_json: &str,
        payload_size: i64,
        expires_at: Option<&str>,
    ) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO handoff_queue (package_id, created_at, status, payload_json, payload_size, expires_at, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
                params![package_id, created_at, status_str(status), payload_json, payload_size, expires_at],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn fetch_latest_handoff(&self, status: HandoffStatus) -> Result<Option<HandoffQueueRow>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, package_id, created_at, status, payload_json, payload_size, expires_at, error
                 FROM handoff_queue WHERE status = ?1 ORDER BY created_at DESC LIMIT 1",
                params![status_str(status)],
                |row| {
                    Ok(HandoffQueueRow {
                        id: row.get(0)?,
                        package_id: row.get(1)?,
                        created_at: row.get(2)?,
                        status,
                        payload_json: row.get(4)?,
                        payload_size: row.get(5)?,
                        expires_at: row.get(6)?,
                        error: row.get(7)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn clear_pending_handoff(&self) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM handoff_queue WHERE status = 'pending'", [])
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn mark_handoff_status(&self, handoff_id: i64, status: HandoffStatus, error: Option<&str>) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "UPDATE handoff_queue SET status = ?1, error = ?2 WHERE id = ?3",
                params![status_str(status), error, handoff_id],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn get_state(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .lock()
            .query_row("SELECT value FROM state WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Store(e.to_string()))
    }

    pub fn set_state(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO state (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn get_db_size(&self) -> u64 {
        std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
    }

    pub fn checkpoint_wal(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch("VACUUM;")
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    pub fn delete_old_events(&self, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        self.delete_by_cutoff("events", "ts", cutoff_ts, batch_size)
    }

    pub fn delete_old_sessions(&self, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        self.delete_by_cutoff("sessions", "end_ts", cutoff_ts, batch_size)
    }

    pub fn delete_old_routines(&self, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        self.delete_by_cutoff("routine_candidates", "last_seen_ts", cutoff_ts, batch_size)
    }

    pub fn delete_old_handoff(&self, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        self.delete_by_cutoff("handoff_queue", "created_at", cutoff_ts, batch_size)
    }

    pub fn delete_old_daily_summaries(&self, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        self.delete_by_cutoff("daily_summaries", "created_at", cutoff_ts, batch_size)
    }

    pub fn delete_old_pattern_summaries(&self, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        self.delete_by_cutoff("pattern_summaries", "created_at", cutoff_ts, batch_size)
    }

    pub fn delete_old_llm_inputs(&self, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        self.delete_by_cutoff("llm_inputs", "created_at", cutoff_ts, batch_size)
    }

    pub fn expire_pending_handoff(&self, cutoff_ts: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE handoff_queue SET status = 'expired' WHERE status = 'pending' AND created_at < ?1",
            params![cutoff_ts],
        )
        .map(|n| n as i64)
        .map_err(|e| Error::Store(e.to_string()))
    }

    fn delete_by_cutoff(&self, table: &str, ts_column: &str, cutoff_ts: &str, batch_size: i64) -> Result<i64> {
        let conn = self.conn.lock();
        let mut total = 0i64;
        if batch_size > 0 {
            loop {
                let removed = conn
                    .execute(
                        &format!(
                            "DELETE FROM {table} WHERE rowid IN (SELECT rowid FROM {table} WHERE {ts_column} < ?1 LIMIT ?2)"
                        ),
                        params![cutoff_ts, batch_size],
                    )
                    .map_err(|e| Error::Store(e.to_string()))? as i64;
                total += removed;
                if removed < batch_size {
                    break;
                }
            }
        } else {
            total = conn
                .execute(&format!("DELETE FROM {table} WHERE {ts_column} < ?1"), params![cutoff_ts])
                .map_err(|e| Error::Store(e.to_string()))? as i64;
        }
        Ok(total)
    }
}

fn status_str(status: HandoffStatus) -> &'static str {
    match status {
        HandoffStatus::Pending => "pending",
        HandoffStatus::Expired => "expired",
        HandoffStatus::Sent => "sent",
        HandoffStatus::Failed => "failed",
    }
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub ts: String,
    pub event_type: String,
    pub priority: String,
    pub app: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub payload_json: String,
}

#[derive(Debug, Clone)]
pub struct LatestEventRow {
    pub ts: String,
    pub event_type: String,
    pub priority: String,
    pub app: Option<String>,
    pub payload_json: String,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub session_id: String,
    pub start_ts: String,
    pub end_ts: String,
    pub duration_sec: i64,
    pub summary_json: String,
}

#[derive(Debug, Clone)]
pub struct RoutineCandidateRow {
    pub pattern_id: String,
    pub pattern_json: String,
    pub support: i64,
    pub confidence: f64,
    pub last_seen_ts: String,
    pub evidence_session_ids_json: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_domain::model::{PrivacyMetadata, ResourceRef};

    fn sample_event(id: &str) -> EventEnvelope {
        EventEnvelope {
            schema_version: "1.0".into(),
            event_id: id.into(),
            ts: "2026-07-31T12:00:00Z".into(),
            source: "test".into(),
            app: "chrome".into(),
            event_type: "os.foreground_changed".into(),
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
    fn inserts_and_fetches_events() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.db"), 1000, EncryptionConfig::default()).unwrap();
        store.insert_event(&sample_event("evt-1")).unwrap();
        let rows = store.fetch_events(None, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_type, "os.foreground_changed");
    }

    #[test]
    fn state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.db"), 1000, EncryptionConfig::default()).unwrap();
        store.set_state("last_session_end", "2026-07-31T12:00:00Z").unwrap();
        assert_eq!(
            store.get_state("last_session_end").unwrap(),
            Some("2026-07-31T12:00:00Z".to_string())
        );
        assert_eq!(store.get_state("missing").unwrap(), None);
    }

    #[test]
    fn batched_delete_by_cutoff_removes_only_older_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.db"), 1000, EncryptionConfig::default()).unwrap();
        store.insert_event(&sample_event("evt-old")).unwrap();
        let mut newer = sample_event("evt-new");
        newer.ts = "2026-08-15T00:00:00Z".into();
        store.insert_event(&newer).unwrap();

        let removed = store.delete_old_events("2026-08-01T00:00:00Z", 1).unwrap();
        assert_eq!(removed, 1);
        let remaining = store.fetch_events(None, None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].ts, "2026-08-15T00:00:00Z");
    }

    #[test]
    fn encrypted_raw_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("COLLECTOR_TEST_ENC_KEY", "a-test-key-that-is-not-empty");
        let encryption = EncryptionConfig {
            enabled: true,
            key_env: "COLLECTOR_TEST_ENC_KEY".into(),
            key_path: String::new(),
            encrypt_raw_json: true,
        };
        let store = Store::open(dir.path().join("test.db"), 1000, encryption).unwrap();
        let mut event = sample_event("evt-enc");
        event.raw.insert("secret".into(), serde_json::json!("value"));
        store.insert_event(&event).unwrap();
        let rows = store.fetch_events(None, None).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
