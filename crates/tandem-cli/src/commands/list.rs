use chrono::Utc;

use crate::cli::StatusFilter;
use crate::commands::common::{
    format_task_lines, status_matches, task_to_list_item, CliContext, TaskListItem,
};
use crate::error::CliError;

pub async fn run_list(
    ctx: &CliContext,
    status: Option<StatusFilter>,
    mine: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let mut tasks = ctx.engine.cached_tasks().await?;
    if let Some(filter) = status {
        tasks.retain(|task| status_matches(filter, task.status));
    }
    if mine {
        tasks.retain(|task| task.assigned_to.as_ref() == Some(&ctx.user_id));
    }
    tasks.sort_by_key(|task| std::cmp::Reverse(task.updated_at));

    let now_ms = Utc::now().timestamp_millis();
    if as_json {
        let items = tasks
            .iter()
            .map(|task| task_to_list_item(task, now_ms))
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if tasks.is_empty() {
        println!("No tasks.");
    } else {
        for line in format_task_lines(&tasks, now_ms) {
            println!("{line}");
        }
    }

    Ok(())
}
