//! Periodic housekeeping: delete aged-out rows, expire stale pending
//! handoffs, checkpoint the WAL, and vacuum when the database has grown
//! too large.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use collector_domain::config::RetentionConfig;
use collector_store::Store;
use serde_json::{json, Value};

pub fn spawn(store: Arc<Store>, config: RetentionConfig) {
    tokio::spawn(async move {
        if !config.enabled {
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(config.interval_minutes.max(1) * 60));
        let mut last_vacuum = Instant::now();
        loop {
            interval.tick().await;
            match run_once(&store, &config, &mut last_vacuum) {
                Ok(record) => tracing::info!(result = %record, "retention cycle complete"),
                Err(e) => tracing::error!(error = %e, "retention cycle failed"),
            }
        }
    });
}

/// Run one retention cycle and return a JSON summary record.
pub fn run_once(store: &Store, config: &RetentionConfig, last_vacuum: &mut Instant) -> anyhow::Result<Value> {
    let now = Utc::now();
    let batch = config.batch_size;
    let cutoff = |days: i64| (now - chrono::Duration::days(days)).to_rfc3339();

    let size_before = store.get_db_size();

    // A `days <= 0` retention setting means "keep forever": skip the
    // delete entirely rather than passing a cutoff that matches every row.
    let events_deleted = if config.raw_events_days > 0 {
        store.delete_old_events(&cutoff(config.raw_events_days), batch)?
    } else {
        0
    };
    let sessions_deleted = if config.sessions_days > 0 {
        store.delete_old_sessions(&cutoff(config.sessions_days), batch)?
    } else {
        0
    };
    let routines_deleted = if config.routine_candidates_days > 0 {
        store.delete_old_routines(&cutoff(config.routine_candidates_days), batch)?
    } else {
        0
    };
    let handoff_deleted = if config.handoff_queue_days > 0 {
        store.delete_old_handoff(&cutoff(config.handoff_queue_days), batch)?
    } else {
        0
    };
    let daily_deleted = if config.daily_summaries_days > 0 {
        store.delete_old_daily_summaries(&cutoff(config.daily_summaries_days), batch)?
    } else {
        0
    };
    let pattern_deleted = if config.pattern_summaries_days > 0 {
        store.delete_old_pattern_summaries(&cutoff(config.pattern_summaries_days), batch)?
    } else {
        0
    };
    let llm_inputs_deleted = if config.llm_inputs_days > 0 {
        store.delete_old_llm_inputs(&cutoff(config.llm_inputs_days), batch)?
    } else {
        0
    };
    let handoffs_expired = if config.handoff_queue_days > 0 {
        store.expire_pending_handoff(&cutoff(config.handoff_queue_days))?
    } else {
        0
    };

    store.checkpoint_wal()?;

    let size_after_checkpoint = store.get_db_size();
    let due_for_timed_vacuum = last_vacuum.elapsed() >= Duration::from_secs(config.vacuum_hours.max(1) as u64 * 3600);
    let over_size_limit = size_after_checkpoint > (config.max_db_mb.max(0) as u64).saturating_mul(1024 * 1024);

    let vacuumed = if due_for_timed_vacuum || over_size_limit {
        store.vacuum()?;
        *last_vacuum = Instant::now();
        true
    } else {
        false
    };

    let size_after = store.get_db_size();

    Ok(json!({
        "ran_at": now.to_rfc3339(),
        "events_deleted": events_deleted,
        "sessions_deleted": sessions_deleted,
        "routine_candidates_deleted": routines_deleted,
        "handoff_deleted": handoff_deleted,
        "handoffs_expired": handoffs_expired,
        "daily_summaries_deleted": daily_deleted,
        "pattern_summaries_deleted": pattern_deleted,
        "llm_inputs_deleted": llm_inputs_deleted,
        "db_size_bytes_before": size_before,
        "db_size_bytes_after_checkpoint": size_after_checkpoint,
        "db_size_bytes_after": size_after,
        "vacuumed": vacuumed,
    }))
}
