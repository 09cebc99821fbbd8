use collector_derive::sessionizer::{build_session_records, rows_to_events, sessionize};
use collector_domain::config::Config;

use super::{open_store, TimeRangeArgs};

const STATE_KEY: &str = "last_sessionized_ts";

pub fn run(config: &Config, args: &TimeRangeArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let (start, end) = args.resolve(&store, STATE_KEY)?;

    let rows = store.fetch_events(Some(&start), Some(&end))?;
    let events = rows_to_events(&rows);
    let sessions = sessionize(&events, config.sessionizer.gap_seconds);
    let records = build_session_records(sessions, &config.sessionizer.key_event_types);

    println!("sessionized {} event(s) from {start} to {end} into {} session(s)", events.len(), records.len());

    if args.dry_run {
        for record in &records {
            println!("  {} {} -> {} ({}s)", record.session_id, record.start_ts, record.end_ts, record.duration_sec);
        }
        return Ok(());
    }

    for record in &records {
        store.insert_session(
            &record.session_id,
            &record.start_ts,
            &record.end_ts,
            record.duration_sec,
            &serde_json::to_string(&record.summary)?,
        )?;
    }
    store.set_state(STATE_KEY, &end)?;

    Ok(())
}
