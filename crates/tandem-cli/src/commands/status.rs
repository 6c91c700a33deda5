use serde::Serialize;

use crate::commands::common::{format_timestamp, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StatusReport {
    online: bool,
    pending_actions: usize,
    unconfirmed_edits: usize,
    recent_conflicts: usize,
    last_synced_at: Option<i64>,
}

pub async fn run_status(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let conflicts = ctx.engine.recent_conflicts().await?;
    let report = StatusReport {
        online: ctx.engine.is_online(),
        pending_actions: ctx.engine.pending_count().await?,
        unconfirmed_edits: ctx.engine.optimistic_count().await?,
        recent_conflicts: conflicts.len(),
        last_synced_at: ctx.engine.last_synced_at().await?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "network      {}",
        if report.online { "online" } else { "offline" }
    );
    println!("queued       {} pending action(s)", report.pending_actions);
    println!("unconfirmed  {} optimistic edit(s)", report.unconfirmed_edits);
    println!("conflicts    {} recently resolved", report.recent_conflicts);
    match report.last_synced_at {
        Some(ms) => println!("last sync    {}", format_timestamp(ms)),
        None => println!("last sync    never"),
    }

    if let Some(conflict) = conflicts.last() {
        println!(
            "latest       {} resolved as {}: {}",
            conflict.conflict_type, conflict.resolution, conflict.details
        );
    }

    Ok(())
}
