use crate::commands::common::{resolve_task, short_id, CliContext};
use crate::error::CliError;

pub async fn run_complete(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let tasks = ctx.engine.cached_tasks().await?;
    let task = resolve_task(id, &tasks)?;

    let done = ctx
        .engine
        .complete_task(&task.id, ctx.user_id.clone())
        .await?;
    println!("{}  {} done", short_id(&done.id), done.title);
    Ok(())
}
