use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_interval")]
    pub interval_minutes: u64,
    #[serde(default = "d_raw_days")]
    pub raw_events_days: i64,
    #[serde(default = "d_sessions_days")]
    pub sessions_days: i64,
    #[serde(default = "d_routine_days")]
    pub routine_candidates_days: i64,
    #[serde(default = "d_handoff_days")]
    pub handoff_queue_days: i64,
    #[serde(default = "d_daily_days")]
    pub daily_summaries_days: i64,
    #[serde(default = "d_pattern_days")]
    pub pattern_summaries_days: i64,
    #[serde(default = "d_llm_days")]
    pub llm_inputs_days: i64,
    #[serde(default = "d_max_db_mb")]
    pub max_db_mb: i64,
    #[serde(default = "d_batch_size")]
    pub batch_size: i64,
    #[serde(default = "d_vacuum_hours")]
    pub vacuum_hours: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: d_interval(),
            raw_events_days: d_raw_days(),
            sessions_days: d_sessions_days(),
            routine_candidates_days: d_routine_days(),
            handoff_queue_days: d_handoff_days(),
            daily_summaries_days: d_daily_days(),
            pattern_summaries_days: d_pattern_days(),
            llm_inputs_days: d_llm_days(),
            max_db_mb: d_max_db_mb(),
            batch_size: d_batch_size(),
            vacuum_hours: d_vacuum_hours(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_interval() -> u64 {
    60
}
fn d_raw_days() -> i64 {
    7
}
fn d_sessions_days() -> i64 {
    30
}
fn d_routine_days() -> i64 {
    90
}
fn d_handoff_days() -> i64 {
    7
}
fn d_daily_days() -> i64 {
    180
}
fn d_pattern_days() -> i64 {
    60
}
fn d_llm_days() -> i64 {
    30
}
fn d_max_db_mb() -> i64 {
    500
}
fn d_batch_size() -> i64 {
    5000
}
fn d_vacuum_hours() -> i64 {
    24
}
