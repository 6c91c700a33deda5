use tandem_core::models::TaskChanges;

use crate::commands::common::{parse_due_date, resolve_task, short_id, CliContext};
use crate::error::CliError;

#[allow(clippy::fn_params_excessive_bools)]
pub async fn run_update(
    ctx: &CliContext,
    id: &str,
    title: Option<&str>,
    description: Option<&str>,
    category: Option<&str>,
    due: Option<&str>,
    clear_due: bool,
) -> Result<(), CliError> {
    let tasks = ctx.engine.cached_tasks().await?;
    let task = resolve_task(id, &tasks)?;

    let due_date = if clear_due {
        Some(None)
    } else {
        due.map(parse_due_date).transpose()?.map(Some)
    };

    let changes = TaskChanges {
        title: title.map(ToString::to_string),
        description: description.map(ToString::to_string),
        category: category.map(ToString::to_string),
        status: None,
        assigned_to: None,
        due_date,
    };

    let updated = ctx.engine.update_task(&task.id, changes).await?;
    println!("{}  {}", short_id(&updated.id), updated.title);
    Ok(())
}
