use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_busy_timeout")]
    pub busy_timeout_ms: u64,
    #[serde(default = "d_batch")]
    pub insert_batch_size: usize,
    #[serde(default = "d_flush_ms")]
    pub insert_flush_ms: u64,
    #[serde(default = "d_retry_attempts")]
    pub insert_retry_attempts: u32,
    #[serde(default = "d_retry_backoff")]
    pub insert_retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: d_busy_timeout(),
            insert_batch_size: d_batch(),
            insert_flush_ms: d_flush_ms(),
            insert_retry_attempts: d_retry_attempts(),
            insert_retry_backoff_ms: d_retry_backoff(),
        }
    }
}

fn d_busy_timeout() -> u64 {
    5000
}
fn d_batch() -> usize {
    100
}
fn d_flush_ms() -> u64 {
    1000
}
fn d_retry_attempts() -> u32 {
    3
}
fn d_retry_backoff() -> u64 {
    50
}
