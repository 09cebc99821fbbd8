use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "d_key_env")]
    pub key_env: String,
    #[serde(default)]
    pub key_path: String,
    #[serde(default)]
    pub encrypt_raw_json: bool,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key_env: d_key_env(),
            key_path: String::new(),
            encrypt_raw_json: false,
        }
    }
}

fn d_key_env() -> String {
    "DATA_COLLECTOR_ENC_KEY".into()
}
