use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tandem_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No task title provided")]
    EmptyTitle,
    #[error("Task not found for id/prefix: {0}")]
    TaskNotFound(String),
    #[error("{0}")]
    AmbiguousTaskId(String),
    #[error("Invalid due date '{0}'; expected YYYY-MM-DD")]
    InvalidDueDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Set TANDEM_API_URL, TANDEM_USER_ID and TANDEM_PARTNERSHIP_ID (and optionally TANDEM_API_TOKEN) to enable `tandem`."
    )]
    SyncNotConfigured,
}
