use collector_domain::config::Config;

use super::open_store;
use crate::runtime::retention::run_once;

pub fn run(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        println!("dry run: retention cycle not executed");
        return Ok(());
    }
    let store = open_store(config)?;
    let mut last_vacuum = std::time::Instant::now() - std::time::Duration::from_secs(config.retention.vacuum_hours.max(1) as u64 * 3600);
    let result = run_once(&store, &config.retention, &mut last_vacuum)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
