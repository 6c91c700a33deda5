use crate::commands::common::{resolve_task, short_id, CliContext};
use crate::error::CliError;

pub async fn run_delete(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let tasks = ctx.engine.cached_tasks().await?;
    let task = resolve_task(id, &tasks)?;

    ctx.engine.delete_task(&task.id).await?;
    println!("{}  {} deleted", short_id(&task.id), task.title);
    Ok(())
}
