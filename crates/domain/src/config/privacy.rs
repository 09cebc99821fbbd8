use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlMode {
    Rules,
    Full,
    Domain,
}

impl Default for UrlMode {
    fn default() -> Self {
        UrlMode::Rules
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    #[serde(default = "d_salt")]
    pub hash_salt: String,
    #[serde(default)]
    pub url_mode: UrlMode,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            hash_salt: d_salt(),
            url_mode: UrlMode::Rules,
        }
    }
}

fn d_salt() -> String {
    "dev-salt".into()
}
