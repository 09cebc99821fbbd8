use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDetailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "d_min_duration")]
    pub min_duration_sec: f64,
    #[serde(default = "d_true")]
    pub store_hint: bool,
    #[serde(default)]
    pub full_title_apps: Vec<String>,
    #[serde(default = "d_max_title_len")]
    pub max_title_len: usize,
}

impl Default for ActivityDetailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_duration_sec: d_min_duration(),
            store_hint: true,
            full_title_apps: Vec::new(),
            max_title_len: d_max_title_len(),
        }
    }
}

fn d_min_duration() -> f64 {
    5.0
}
fn d_true() -> bool {
    true
}
fn d_max_title_len() -> usize {
    256
}
