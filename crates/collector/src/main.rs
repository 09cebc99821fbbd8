use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

use collector::api;
use collector::cli::{self, Cli, Command};
use collector::runtime::bus::EventBus;
use collector::runtime::observability::{spawn_minute_logger, Observability};
use collector::runtime::retention;
use collector::state::AppState;
use collector_domain::config::{Config, ConfigSeverity};
use collector_priority::PriorityProcessor;
use collector_privacy::{load_privacy_rules, PrivacyGuard};
use collector_store::Store;
use parking_lot::Mutex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Run) => {
            init_tracing();
            let (config, _config_path) = collector_domain::config::load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::BuildSessions(args)) => {
            let (config, _) = collector_domain::config::load_config()?;
            cli::build_sessions::run(&config, &args)
        }
        Some(Command::BuildRoutines(args)) => {
            let (config, _) = collector_domain::config::load_config()?;
            cli::build_routines::run(&config, &args)
        }
        Some(Command::BuildHandoff(args)) => {
            let (config, _) = collector_domain::config::load_config()?;
            cli::build_handoff::run(&config, &args)
        }
        Some(Command::BuildDailySummary(args)) => {
            let (config, _) = collector_domain::config::load_config()?;
            cli::build_summaries::run_daily(&config, &args)
        }
        Some(Command::BuildPatternSummary(args)) => {
            let (config, _) = collector_domain::config::load_config()?;
            cli::build_summaries::run_pattern(&config, &args)
        }
        Some(Command::RunRetention { dry_run }) => {
            let (config, _) = collector_domain::config::load_config()?;
            cli::retention::run(&config, dry_run)
        }
    }
}

/// Initialize structured JSON tracing (only for the `run` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("COLLECTOR_LOG")
                .ok()
                .map(EnvFilter::new)
                .or_else(|| EnvFilter::try_from_default_env().ok())
                .unwrap_or_else(|| EnvFilter::new("info,collector=debug")),
        )
        .json()
        .init();
}

/// Start the ingest server and its background workers.
async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("collector starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    // ── Store ─────────────────────────────────────────────────────────
    let store = Arc::new(
        Store::open(&config.db_path, config.store.busy_timeout_ms, config.encryption.clone())
            .context("opening store")?,
    );
    tracing::info!(db_path = %config.db_path, "store ready");

    // ── Privacy guard ─────────────────────────────────────────────────
    let rules = load_privacy_rules(&config.privacy_rules_path).context("loading privacy rules")?;
    let privacy = Arc::new(PrivacyGuard::new(rules, config.privacy.hash_salt.clone()));
    tracing::info!(path = %config.privacy_rules_path, "privacy rules loaded");

    // ── Priority processor ───────────────────────────────────────────
    let priority = Arc::new(Mutex::new(PriorityProcessor::new(&config.priority)));

    // ── Observability ────────────────────────────────────────────────
    let observability = Arc::new(Observability::new(&config.observability));
    spawn_minute_logger(observability.clone());

    // ── Event bus ────────────────────────────────────────────────────
    let bus = EventBus::spawn(config.clone(), store.clone(), privacy.clone(), priority.clone(), observability.clone());
    tracing::info!(max_size = config.queue.max_size, "event bus running");

    // ── Retention loop ───────────────────────────────────────────────
    if config.retention.enabled {
        retention::spawn(store.clone(), config.retention.clone());
        tracing::info!(interval_minutes = config.retention.interval_minutes, "retention loop scheduled");
    }

    // ── Ingest token ─────────────────────────────────────────────────
    let token_hash = if config.ingest.token.is_empty() {
        tracing::warn!("no ingest token configured; /events is open to any local caller");
        None
    } else {
        Some(Sha256::digest(config.ingest.token.as_bytes()).to_vec())
    };

    let state = AppState {
        config: config.clone(),
        store,
        privacy,
        priority,
        bus,
        observability,
        token_hash,
    };

    // ── Router ───────────────────────────────────────────────────────
    let app = api::router(state.clone()).with_state(state);

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.ingest.host, config.ingest.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "collector listening");

    axum::serve(listener, app).await.context("axum server error")?;

    Ok(())
}
