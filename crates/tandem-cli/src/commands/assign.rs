use tandem_core::models::UserId;

use crate::commands::common::{resolve_task, short_id, CliContext};
use crate::error::CliError;

pub async fn run_assign(
    ctx: &CliContext,
    id: &str,
    to: Option<&str>,
    clear: bool,
) -> Result<(), CliError> {
    let tasks = ctx.engine.cached_tasks().await?;
    let task = resolve_task(id, &tasks)?;

    let assignee = if clear {
        None
    } else {
        match to {
            Some(user) => Some(UserId::new(user)),
            None => {
                return Err(CliError::Config(
                    "assign requires --to <USER> or --clear".to_string(),
                ))
            }
        }
    };

    let assigned = ctx.engine.assign_task(&task.id, assignee.clone()).await?;
    match assignee {
        Some(user) => println!("{}  {} -> @{user}", short_id(&assigned.id), assigned.title),
        None => println!("{}  {} unassigned", short_id(&assigned.id), assigned.title),
    }
    Ok(())
}
