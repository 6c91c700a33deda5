use crate::commands::common::CliContext;
use crate::error::CliError;

pub async fn run_sync(
    ctx: &CliContext,
    retry_only: bool,
    force: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let result = if retry_only {
        ctx.engine.retry_failed().await?
    } else if force {
        ctx.engine.force_drain().await?
    } else {
        ctx.engine.drain().await?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.success {
        println!("Sync completed: {} action(s) applied", result.synced_count);
    } else {
        println!(
            "Sync incomplete: {} applied, {} failed",
            result.synced_count, result.failed_count
        );
    }

    for conflict in &result.conflicts {
        let task = conflict
            .task_id
            .map_or_else(|| "-".to_string(), |id| id.as_str());
        println!(
            "conflict  {:<10}  {:<12}  task={task}  {}",
            conflict.conflict_type, conflict.resolution, conflict.details
        );
    }
    for error in &result.errors {
        println!("error  {error}");
    }

    Ok(())
}
