use collector_derive::summaries::{build_daily_summary, build_pattern_summary};
use collector_domain::config::Config;

use super::{open_store, TimeRangeArgs};

pub fn run_daily(config: &Config, args: &TimeRangeArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let (start, end) = args.resolve(&store, "last_daily_summary_ts")?;

    let sessions = store
        .fetch_recent_sessions(10_000)?
        .into_iter()
        .filter(|s| s.start_ts.as_str() >= start.as_str() && s.start_ts.as_str() <= end.as_str())
        .collect::<Vec<_>>();

    let payload = build_daily_summary(&sessions);
    let date_local = chrono::Utc::now().format("%Y-%m-%d").to_string();

    println!("daily summary for {date_local}: {} session(s)", sessions.len());

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    store.upsert_daily_summary(
        &date_local,
        &start,
        &end,
        &serde_json::to_string(&payload)?,
        &chrono::Utc::now().to_rfc3339(),
    )?;

    Ok(())
}

pub fn run_pattern(config: &Config, args: &TimeRangeArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let candidates = store.fetch_routine_candidates(1000)?;
    let payload = build_pattern_summary(&candidates, args.days);

    println!("pattern summary over {} day(s): {} candidate(s)", args.days, candidates.len());

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    store.insert_pattern_summary(&chrono::Utc::now().to_rfc3339(), args.days, &serde_json::to_string(&payload)?)?;

    Ok(())
}
