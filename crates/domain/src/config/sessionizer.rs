use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionizerConfig {
    /// Idle gap, in seconds, that closes the current session.
    #[serde(default = "d_gap")]
    pub gap_seconds: i64,
    /// Extra P1 event types counted as "key events" in a session summary,
    /// on top of the compiled-in default (`outlook.compose_started`,
    /// `outlook.attachment_added_meta`, `excel.refresh_pivot`).
    #[serde(default)]
    pub key_event_types: Vec<String>,
}

impl Default for SessionizerConfig {
    fn default() -> Self {
        Self {
            gap_seconds: d_gap(),
            key_event_types: Vec::new(),
        }
    }
}

fn d_gap() -> i64 {
    600
}
