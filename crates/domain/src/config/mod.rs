mod activity_detail;
mod encryption;
mod ingest;
mod logging;
mod observability;
mod priority;
mod privacy;
mod queue;
mod retention;
mod sessionizer;
mod store;

pub use activity_detail::*;
pub use encryption::*;
pub use ingest::*;
pub use logging::*;
pub use observability::*;
pub use priority::*;
pub use privacy::*;
pub use queue::*;
pub use retention::*;
pub use sessionizer::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub activity_detail: ActivityDetailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sessionizer: SessionizerConfig,

    /// How strictly the normalizer treats malformed inbound events.
    #[serde(default = "d_validation_level")]
    pub validation_level: String,
    /// Whether the store opens its connection in SQLite WAL journal mode.
    #[serde(default = "d_true")]
    pub wal_mode: bool,
    /// Tracing filter directive used when no `RUST_LOG`/`COLLECTOR_LOG` is set.
    #[serde(default = "d_log_level")]
    pub log_level: String,
    /// Path to the TOML-or-YAML privacy rules file.
    #[serde(default = "d_privacy_rules_path")]
    pub privacy_rules_path: String,
    /// Path to the SQLite database file.
    #[serde(default = "d_db_path")]
    pub db_path: String,
    /// Directory of embedded/external migration SQL files.
    #[serde(default = "d_migrations_path")]
    pub migrations_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            queue: QueueConfig::default(),
            privacy: PrivacyConfig::default(),
            store: StoreConfig::default(),
            encryption: EncryptionConfig::default(),
            priority: PriorityConfig::default(),
            retention: RetentionConfig::default(),
            observability: ObservabilityConfig::default(),
            activity_detail: ActivityDetailConfig::default(),
            logging: LoggingConfig::default(),
            sessionizer: SessionizerConfig::default(),
            validation_level: d_validation_level(),
            wal_mode: true,
            log_level: d_log_level(),
            privacy_rules_path: d_privacy_rules_path(),
            db_path: d_db_path(),
            migrations_path: d_migrations_path(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_validation_level() -> String {
    "lenient".into()
}
fn d_log_level() -> String {
    "info".into()
}
fn d_privacy_rules_path() -> String {
    "privacy_rules.toml".into()
}
fn d_db_path() -> String {
    "collector.db".into()
}
fn d_migrations_path() -> String {
    "migrations".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.ingest.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "ingest.port".into(),
                message: "port must be non-zero".into(),
            });
        }

        if self.queue.max_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "queue.max_size".into(),
                message: "max_size must be greater than zero".into(),
            });
        }

        if self.priority.debounce_seconds < 0.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "priority.debounce_seconds".into(),
                message: "debounce_seconds cannot be negative".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.priority.drop_p2_when_queue_over) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "priority.drop_p2_when_queue_over".into(),
                message: "must be a ratio between 0.0 and 1.0".into(),
            });
        }

        if self.privacy.hash_salt == "dev-salt" {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "privacy.hash_salt".into(),
                message: "using the default development salt; set a private value before collecting real data".into(),
            });
        }

        if self.encryption.enabled && self.encryption.key_env.is_empty() && self.encryption.key_path.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "encryption".into(),
                message: "encryption is enabled but neither key_env nor key_path is set".into(),
            });
        }

        if self.retention.enabled && self.retention.interval_minutes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "retention.interval_minutes".into(),
                message: "interval_minutes must be greater than zero when retention is enabled".into(),
            });
        }

        if self.retention.max_db_mb <= 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "retention.max_db_mb".into(),
                message: "max_db_mb should be positive".into(),
            });
        }

        if self.store.insert_batch_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.insert_batch_size".into(),
                message: "insert_batch_size must be greater than zero".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config loading
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Load the configuration from the path specified by `COLLECTOR_CONFIG`
/// (or `config.toml` by default). Returns the parsed [`Config`] and the
/// path that was used. Falls back to [`Config::default`] when the file
/// does not exist.
pub fn load_config() -> crate::Result<(Config, String)> {
    let config_path =
        std::env::var("COLLECTOR_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)?;
        toml::from_str(&raw).map_err(|e| crate::Error::Config(format!("parsing {config_path}: {e}")))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_issue<'a>(issues: &'a [ConfigError], field: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field == field)
    }

    #[test]
    fn default_config_has_only_the_dev_salt_warning() {
        let cfg = Config::default();
        let issues = cfg.validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(find_issue(&issues, "privacy.hash_salt").is_some());
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut cfg = Config::default();
        cfg.ingest.port = 0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "ingest.port").expect("expected an issue");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn encryption_without_key_source_is_an_error() {
        let mut cfg = Config::default();
        cfg.encryption.enabled = true;
        cfg.encryption.key_env = String::new();
        cfg.encryption.key_path = String::new();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "encryption").expect("expected an issue");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn out_of_range_drop_ratio_is_an_error() {
        let mut cfg = Config::default();
        cfg.priority.drop_p2_when_queue_over = 1.5;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "priority.drop_p2_when_queue_over").expect("expected an issue");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string(&cfg).expect("serialize");
        let back: Config = toml::from_str(&s).expect("deserialize");
        assert_eq!(back.ingest.port, cfg.ingest.port);
    }
}
