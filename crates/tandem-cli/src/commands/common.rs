use std::env;
use std::path::PathBuf;

use chrono::{NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tandem_core::models::{PartnershipId, Task, TaskId, TaskStatus, UserId};
use tandem_core::net::{NetworkStatus, WatchNetworkMonitor};
use tandem_core::remote::HttpRemoteStore;
use tandem_core::store::StoreService;
use tandem_core::SyncEngine;

use crate::cli::StatusFilter;
use crate::error::CliError;

const SHORT_ID_LEN: usize = 8;

/// Everything a command needs: the engine plus the caller's identity.
pub struct CliContext {
    pub engine: SyncEngine<HttpRemoteStore, WatchNetworkMonitor>,
    pub user_id: UserId,
    pub partnership_id: PartnershipId,
}

/// Build the CLI context from the environment.
///
/// Connectivity is probed once against the API health endpoint; commands run
/// too briefly for a live monitor to matter.
pub async fn open_context(db_path: Option<PathBuf>) -> Result<CliContext, CliError> {
    let api_url = env::var("TANDEM_API_URL").map_err(|_| CliError::SyncNotConfigured)?;
    let api_token = env::var("TANDEM_API_TOKEN").ok();
    let user_id = env::var("TANDEM_USER_ID").map_err(|_| CliError::SyncNotConfigured)?;
    let partnership_id =
        env::var("TANDEM_PARTNERSHIP_ID").map_err(|_| CliError::SyncNotConfigured)?;

    let db_path = resolve_db_path(db_path);
    tracing::debug!("Using local store at {}", db_path.display());
    let store = StoreService::open_path(db_path)?;
    let remote = HttpRemoteStore::new(api_url, api_token)
        .map_err(|error| CliError::Config(error.to_string()))?;

    let status = if remote.is_reachable().await {
        NetworkStatus::online()
    } else {
        tracing::debug!("Remote API unreachable, running offline");
        NetworkStatus::offline()
    };
    let monitor = WatchNetworkMonitor::new(status);

    let engine = SyncEngine::new(store, remote, monitor);
    Ok(CliContext {
        engine,
        user_id: UserId::new(user_id),
        partnership_id: PartnershipId::new(partnership_id),
    })
}

pub fn resolve_db_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }
    if let Ok(path) = env::var("TANDEM_DB_PATH") {
        return PathBuf::from(path);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tandem")
        .join("tandem.db")
}

/// Resolve a task by full id or unique id prefix against the cached list.
pub fn resolve_task(query: &str, tasks: &[Task]) -> Result<Task, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::TaskNotFound(String::new()));
    }

    if let Ok(task_id) = query.parse::<TaskId>() {
        if let Some(task) = tasks.iter().find(|t| t.id == task_id) {
            return Ok(task.clone());
        }
    }

    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.id.as_str().starts_with(query))
        .collect();

    match matches.len() {
        0 => Err(CliError::TaskNotFound(query.to_string())),
        1 => Ok(matches[0].clone()),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|t| short_id(&t.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousTaskId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_title(parts: &[String]) -> Result<String, CliError> {
    let title = parts.join(" ").trim().to_string();
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }
    Ok(title)
}

/// Parse a YYYY-MM-DD due date into Unix ms at midnight UTC.
pub fn parse_due_date(raw: &str) -> Result<i64, CliError> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDueDate(raw.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidDueDate(raw.to_string()))?;
    Ok(Utc.from_utc_datetime(&midnight).timestamp_millis())
}

pub const fn status_matches(filter: StatusFilter, status: TaskStatus) -> bool {
    matches!(
        (filter, status),
        (StatusFilter::Todo, TaskStatus::Todo)
            | (StatusFilter::InProgress, TaskStatus::InProgress)
            | (StatusFilter::Done, TaskStatus::Done)
    )
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
    pub relative_time: String,
}

pub fn task_to_list_item(task: &Task, now_ms: i64) -> TaskListItem {
    TaskListItem {
        id: task.id.as_str(),
        title: task.title.clone(),
        description: task.description.clone(),
        category: task.category.clone(),
        status: task.status,
        assigned_to: task.assigned_to.as_ref().map(ToString::to_string),
        due_date: task.due_date.map(format_date),
        completed_at: task.completed_at,
        updated_at: task.updated_at,
        relative_time: format_relative_time(task.updated_at, now_ms),
    }
}

pub fn format_task_lines(tasks: &[Task], now_ms: i64) -> Vec<String> {
    tasks
        .iter()
        .map(|task| {
            let marker = status_marker(task.status);
            let id = short_id(&task.id);
            let title = clip(&task.title, 36);
            let who = task
                .assigned_to
                .as_ref()
                .map_or_else(String::new, |user| format!("@{user}"));
            let due = task
                .due_date
                .map_or_else(String::new, |ms| format!("due {}", format_date(ms)));
            let relative = format_relative_time(task.updated_at, now_ms);

            format!("{marker} {id:<8}  {title:<36}  {who:<12}  {due:<14}  {relative}")
                .trim_end()
                .to_string()
        })
        .collect()
}

pub const fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Done => "[x]",
    }
}

pub fn short_id(id: &TaskId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let take_len = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(take_len).collect();
    truncated.push_str("...");
    truncated
}

pub fn format_date(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map_or_else(|| timestamp_ms.to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map_or_else(
            || timestamp_ms.to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let delta_secs = (now_ms - timestamp_ms) / 1000;
    if delta_secs < 60 {
        return "just now".to_string();
    }
    let minutes = delta_secs / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{days}d ago");
    }
    format_date(timestamp_ms)
}
