use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "d_max_size")]
    pub max_size: usize,
    #[serde(default = "d_drain")]
    pub shutdown_drain_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: d_max_size(),
            shutdown_drain_seconds: d_drain(),
        }
    }
}

fn d_max_size() -> usize {
    1000
}
fn d_drain() -> u64 {
    3
}
