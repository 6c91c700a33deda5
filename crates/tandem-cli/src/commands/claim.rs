use crate::commands::common::{resolve_task, short_id, CliContext};
use crate::error::CliError;

pub async fn run_claim(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let tasks = ctx.engine.cached_tasks().await?;
    let task = resolve_task(id, &tasks)?;

    let claimed = ctx
        .engine
        .claim_task(&task.id, ctx.user_id.clone())
        .await?;
    println!("{}  {} -> @{}", short_id(&claimed.id), claimed.title, ctx.user_id);
    Ok(())
}
