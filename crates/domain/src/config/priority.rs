use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    #[serde(default = "d_debounce")]
    pub debounce_seconds: f64,
    #[serde(default = "d_focus_types")]
    pub focus_event_types: Vec<String>,
    #[serde(default = "d_focus_block_type")]
    pub focus_block_event_type: String,
    #[serde(default = "d_drop_ratio")]
    pub drop_p2_when_queue_over: f64,
    #[serde(default)]
    pub p0_event_types: Vec<String>,
    #[serde(default)]
    pub p1_event_types: Vec<String>,
    #[serde(default)]
    pub p2_event_types: Vec<String>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: d_debounce(),
            focus_event_types: d_focus_types(),
            focus_block_event_type: d_focus_block_type(),
            drop_p2_when_queue_over: d_drop_ratio(),
            p0_event_types: Vec::new(),
            p1_event_types: Vec::new(),
            p2_event_types: Vec::new(),
        }
    }
}

fn d_debounce() -> f64 {
    2.0
}
fn d_focus_types() -> Vec<String> {
    vec!["os.foreground_changed".into()]
}
fn d_focus_block_type() -> String {
    "os.app_focus_block".into()
}
fn d_drop_ratio() -> f64 {
    0.8
}
