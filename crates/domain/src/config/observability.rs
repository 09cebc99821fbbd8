use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "d_log_interval")]
    pub log_interval_sec: u64,
    #[serde(default = "d_true")]
    pub activity_log: bool,
    #[serde(default = "d_top_n")]
    pub activity_top_n: usize,
    #[serde(default = "d_min_duration")]
    pub activity_min_duration_sec: f64,
    #[serde(default)]
    pub activity_include_title: bool,
    #[serde(default)]
    pub activity_title_apps: Vec<String>,
    #[serde(default = "d_title_max_len")]
    pub activity_title_max_len: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_interval_sec: d_log_interval(),
            activity_log: true,
            activity_top_n: d_top_n(),
            activity_min_duration_sec: d_min_duration(),
            activity_include_title: false,
            activity_title_apps: Vec::new(),
            activity_title_max_len: d_title_max_len(),
        }
    }
}

fn d_log_interval() -> u64 {
    60
}
fn d_true() -> bool {
    true
}
fn d_top_n() -> usize {
    3
}
fn d_min_duration() -> f64 {
    5.0
}
fn d_title_max_len() -> usize {
    128
}
