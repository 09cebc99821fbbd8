use collector_derive::routine::{build_routine_candidates, rows_to_sessions, RoutineMiningOptions};
use collector_domain::config::Config;

use super::{open_store, TimeRangeArgs};

const STATE_KEY: &str = "last_routine_ts";

pub fn run(config: &Config, args: &TimeRangeArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let (_start, end) = args.resolve(&store, STATE_KEY)?;

    let rows = store.fetch_recent_sessions(10_000)?;
    let sessions = rows_to_sessions(&rows);
    let candidates = build_routine_candidates(&sessions, &RoutineMiningOptions::default());

    println!("mined {} routine candidate(s) from {} session(s)", candidates.len(), sessions.len());

    if args.dry_run {
        for candidate in &candidates {
            println!("  {} support={} confidence={:.2}", candidate.pattern_id, candidate.support, candidate.confidence);
        }
        return Ok(());
    }

    store.clear_routine_candidates()?;
    for candidate in &candidates {
        store.insert_routine_candidate(candidate)?;
    }
    store.set_state(STATE_KEY, &end)?;

    Ok(())
}
