use collector_derive::handoff::{build_handoff_with_size_guard, HandoffOptions};
use collector_domain::config::Config;
use collector_domain::model::HandoffStatus;
use collector_privacy::load_privacy_rules;

use super::{open_store, TimeRangeArgs};

pub fn run(config: &Config, args: &TimeRangeArgs) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let rules = load_privacy_rules(&config.privacy_rules_path)?;
    let result = build_handoff_with_size_guard(&store, &rules, &HandoffOptions::default())?;

    let package_id = result
        .payload
        .get("package_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let created_at = result
        .payload
        .get("created_at")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    println!("built handoff package {package_id} ({} bytes)", result.size_bytes);

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&result.payload)?);
        return Ok(());
    }

    let payload_json = serde_json::to_string(&result.payload)?;
    let expires_at = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
    store.enqueue_handoff(
        &package_id,
        &created_at,
        HandoffStatus::Pending,
        &payload_json,
        result.size_bytes as i64,
        Some(&expires_at),
    )?;

    Ok(())
}
