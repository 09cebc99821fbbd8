/// Shared error type used across all collector crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema: {kind} ({field})")]
    Schema { kind: String, field: String },

    #[error("store busy: {0}")]
    StoreBusy(String),

    #[error("store: {0}")]
    Store(String),

    #[error("config: {0}")]
    Config(String),

    #[error("privacy rules: {0}")]
    PrivacyRules(String),

    #[error("encryption: {0}")]
    Encryption(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn schema(kind: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Schema {
            kind: kind.into(),
            field: field.into(),
        }
    }
}
