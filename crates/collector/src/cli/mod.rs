pub mod build_handoff;
pub mod build_routines;
pub mod build_sessions;
pub mod build_summaries;
pub mod retention;

use clap::{Parser, Subcommand};

/// collector — a local, privacy-preserving activity collector.
#[derive(Debug, Parser)]
#[command(name = "collector", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the ingest server and background workers (default when no
    /// subcommand is given).
    Run,
    /// Derive session records from raw events.
    BuildSessions(TimeRangeArgs),
    /// Mine routine candidates from recent sessions.
    BuildRoutines(TimeRangeArgs),
    /// Build and enqueue a handoff package from recent sessions and routines.
    BuildHandoff(TimeRangeArgs),
    /// Roll sessions up into the daily_summaries table.
    BuildDailySummary(TimeRangeArgs),
    /// Roll routine candidates up into the pattern_summaries table.
    BuildPatternSummary(TimeRangeArgs),
    /// Run one retention cycle immediately (delete aged rows, checkpoint, vacuum).
    RunRetention {
        #[arg(long)]
        dry_run: bool,
    },
}

/// Shared time-range flags for the derivation subcommands.
#[derive(Debug, Clone, clap::Args)]
pub struct TimeRangeArgs {
    /// Start of the window (RFC3339). Defaults to `--days` ago.
    #[arg(long)]
    pub start: Option<String>,
    /// End of the window (RFC3339). Defaults to now.
    #[arg(long)]
    pub end: Option<String>,
    /// Window size in days, used when `--start` is not given.
    #[arg(long, default_value_t = 7)]
    pub days: i64,
    /// Resume from the last persisted watermark instead of `--start`/`--days`.
    #[arg(long)]
    pub use_state: bool,
    /// Compute and print the result without writing it to the store.
    #[arg(long)]
    pub dry_run: bool,
}

impl TimeRangeArgs {
    /// Resolve `start`/`end` into concrete RFC3339 timestamps, honoring
    /// `use_state` by reading the named watermark key from the store
    /// first when present.
    pub fn resolve(&self, store: &collector_store::Store, state_key: &str) -> anyhow::Result<(String, String)> {
        let end = match &self.end {
            Some(e) => e.clone(),
            None => chrono::Utc::now().to_rfc3339(),
        };
        let start = if let Some(s) = &self.start {
            s.clone()
        } else if self.use_state {
            match store.get_state(state_key)? {
                Some(watermark) => watermark,
                None => (chrono::Utc::now() - chrono::Duration::days(self.days)).to_rfc3339(),
            }
        } else {
            (chrono::Utc::now() - chrono::Duration::days(self.days)).to_rfc3339()
        };
        Ok((start, end))
    }
}

/// Open the store using the resolved [`collector_domain::config::Config`].
pub fn open_store(config: &collector_domain::config::Config) -> anyhow::Result<collector_store::Store> {
    let store = collector_store::Store::open(
        &config.db_path,
        config.store.busy_timeout_ms,
        config.encryption.clone(),
    )?;
    Ok(store)
}
