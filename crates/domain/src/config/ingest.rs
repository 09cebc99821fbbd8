use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default)]
    pub token: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: d_host(),
            port: d_port(),
            token: String::new(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    8080
}
