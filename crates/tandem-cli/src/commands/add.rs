use tandem_core::models::TaskDraft;

use crate::commands::common::{normalize_title, parse_due_date, short_id, CliContext};
use crate::error::CliError;

pub async fn run_add(
    ctx: &CliContext,
    title_parts: &[String],
    description: Option<&str>,
    category: Option<&str>,
    due: Option<&str>,
) -> Result<(), CliError> {
    let draft = TaskDraft {
        title: normalize_title(title_parts)?,
        description: description.unwrap_or_default().to_string(),
        category: category.unwrap_or_default().to_string(),
        due_date: due.map(parse_due_date).transpose()?,
        created_by: ctx.user_id.clone(),
        partnership_id: ctx.partnership_id.clone(),
    };

    let task = ctx.engine.create_task(draft).await?;
    if ctx.engine.is_online() {
        println!("{}  {}", short_id(&task.id), task.title);
    } else {
        println!("{}  {} (queued, offline)", short_id(&task.id), task.title);
    }
    Ok(())
}
