//! Bounded ingest queue. One worker drains it, pipelining every raw
//! event through normalize → privacy → priority, batching the results
//! into the store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use collector_domain::config::Config;
use collector_domain::model::{ActivityDetail, EventEnvelope};
use collector_domain::normalize::{normalize, ValidationMode};
use collector_privacy::{hashing, PrivacyGuard};
use collector_priority::PriorityProcessor;
use collector_store::Store;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::observability::Observability;

pub enum EnqueueError {
    QueueFull,
}

pub struct EventBus {
    sender: mpsc::Sender<serde_json::Value>,
    capacity: usize,
    depth: Arc<std::sync::atomic::AtomicUsize>,
}

impl EventBus {
    /// Spawn the worker task and return a handle for enqueueing events.
    pub fn spawn(
        config: Arc<Config>,
        store: Arc<Store>,
        privacy: Arc<PrivacyGuard>,
        priority: Arc<Mutex<PriorityProcessor>>,
        observability: Arc<Observability>,
    ) -> Arc<Self> {
        let capacity = config.queue.max_size.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let depth = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let worker_depth = depth.clone();
        tokio::spawn(worker_loop(config, store, privacy, priority, observability, receiver, worker_depth));

        Arc::new(Self { sender, capacity, depth })
    }

    /// Enqueue one raw JSON event. Non-blocking: returns an error
    /// immediately if the queue is full rather than waiting.
    pub fn enqueue(&self, event: serde_json::Value) -> Result<(), EnqueueError> {
        match self.sender.try_send(event) {
            Ok(()) => {
                self.depth.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Ok(())
            }
            Err(_) => Err(EnqueueError::QueueFull),
        }
    }

    pub fn queue_ratio(&self) -> f64 {
        self.depth.load(std::sync::atomic::Ordering::Relaxed) as f64 / self.capacity as f64
    }
}

async fn worker_loop(
    config: Arc<Config>,
    store: Arc<Store>,
    privacy: Arc<PrivacyGuard>,
    priority: Arc<Mutex<PriorityProcessor>>,
    observability: Arc<Observability>,
    mut receiver: mpsc::Receiver<serde_json::Value>,
    depth: Arc<std::sync::atomic::AtomicUsize>,
) {
    let validation_mode = ValidationMode::from_config_str(&config.validation_level);
    let batch_size = config.store.insert_batch_size.max(1) as usize;
    let flush_interval = Duration::from_millis(config.store.insert_flush_ms.max(100));
    let retry_attempts = config.store.insert_retry_attempts;
    let retry_backoff_ms = config.store.insert_retry_backoff_ms;
    let activity_detail = config.activity_detail.clone();
    let hash_salt = config.privacy.hash_salt.clone();

    let mut buffer: Vec<EventEnvelope> = Vec::new();
    let mut last_flush = Instant::now();

    loop {
        let timeout = flush_interval.saturating_sub(last_flush.elapsed());
        let received = tokio::time::timeout(timeout.max(Duration::from_millis(1)), receiver.recv()).await;

        match received {
            Ok(Some(raw)) => {
                depth.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
                observability.set_queue_depth(depth.load(std::sync::atomic::Ordering::Relaxed) as u64);
                observability.record_ingest_received(1);

                let envelope = match normalize(&raw, validation_mode) {
                    Ok(env) => env,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed event");
                        observability.record_ingest_invalid();
                        continue;
                    }
                };
                let Some(envelope) = privacy.apply(envelope) else {
                    observability.record_privacy_denied();
                    continue;
                };

                let queue_ratio = depth.load(std::sync::atomic::Ordering::Relaxed) as f64
                    / config.queue.max_size.max(1) as f64;
                let (outputs, drop_reason) = priority.lock().process(envelope, queue_ratio);
                if let Some(reason) = drop_reason {
                    observability.record_drop(match reason {
                        collector_priority::DropReason::QueueOverflow => "queue_overflow",
                        collector_priority::DropReason::Debounce => "debounce",
                    });
                }
                for output in outputs {
                    buffer.push(output);
                }
                observability.record_ingest_ok(1);

                if buffer.len() >= batch_size {
                    flush(&store, &mut buffer, retry_attempts, retry_backoff_ms, &activity_detail, &hash_salt, &observability);
                    last_flush = Instant::now();
                }
            }
            Ok(None) => {
                // Sender dropped — shut down, flushing any final focus block.
                for output in priority.lock().flush() {
                    buffer.push(output);
                }
                flush(&store, &mut buffer, retry_attempts, retry_backoff_ms, &activity_detail, &hash_salt, &observability);
                return;
            }
            Err(_) => {
                // Timed out waiting for the next item — time-based flush.
                if last_flush.elapsed() >= flush_interval {
                    flush(&store, &mut buffer, retry_attempts, retry_backoff_ms, &activity_detail, &hash_salt, &observability);
                    last_flush = Instant::now();
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn flush(
    store: &Store,
    buffer: &mut Vec<EventEnvelope>,
    retry_attempts: u32,
    retry_backoff_ms: u64,
    activity_detail: &collector_domain::config::ActivityDetailConfig,
    hash_salt: &str,
    observability: &Observability,
) {
    if buffer.is_empty() {
        return;
    }
    let batch = std::mem::take(buffer);

    match store.insert_events(&batch, retry_attempts, retry_backoff_ms) {
        Ok(()) => {
            observability.record_store_insert_ok(batch.len() as u64);
            for output in &batch {
                observability.record_priority(&output.priority);
                observability.set_last_event_ts(&output.ts);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to insert event batch");
            observability.record_store_insert_fail();
        }
    }

    if activity_detail.enabled {
        let records = activity_details(&batch, activity_detail, hash_salt);
        if !records.is_empty() {
            if let Err(e) = store.upsert_activity_details(&records) {
                tracing::warn!(error = %e, "failed to upsert activity details");
            }
        }
    }
}

fn activity_details(
    batch: &[EventEnvelope],
    config: &collector_domain::config::ActivityDetailConfig,
    hash_salt: &str,
) -> Vec<ActivityDetail> {
    batch
        .iter()
        .filter(|e| e.event_type_lower() == "os.app_focus_block")
        .filter_map(|e| {
            let duration = e.payload.get("duration_sec").and_then(|v| v.as_i64()).unwrap_or(0);
            if (duration as f64) < config.min_duration_sec {
                return None;
            }
            let raw_title = e.payload.get("window_title").and_then(|v| v.as_str()).unwrap_or("");
            let title = normalize_title(raw_title, &e.app);
            let title_hash = hashing::hmac_sha256(&title, hash_salt);
            let title_hint = if config.store_hint && config.full_title_apps.iter().any(|a| a.eq_ignore_ascii_case(&e.app)) {
                Some(collector_privacy::masking::truncate(&title, config.max_title_len))
            } else {
                None
            };
            Some(ActivityDetail {
                app: e.app.clone(),
                title_hash,
                first_seen_ts: e.ts.clone(),
                last_seen_ts: e.ts.clone(),
                total_duration_sec: duration,
                blocks: 1,
                title_hint,
            })
        })
        .collect()
}

/// Strip a trailing `" - <app>"` suffix (the convention most OS window
/// titles follow) so the hash is stable across minor title churn.
fn normalize_title(title: &str, app: &str) -> String {
    let trimmed = title.trim();
    let suffix = format!(" - {app}");
    trimmed.strip_suffix(suffix.as_str()).unwrap_or(trimmed).trim().to_string()
}
