//! Optimistic update ledger entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::task::{Task, TaskId};

/// A unique identifier for a ledger entry, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateId(Uuid);

impl UpdateId {
    /// Create a new unique update ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for UpdateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UpdateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Durable record of local task state before a tentative mutation.
///
/// `original_task` is `None` for a create (there is no prior state; rollback
/// removes the optimistic projection). `optimistic_task` is `None` for a
/// delete (the tentative result is absence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimisticUpdate {
    pub id: UpdateId,
    pub task_id: TaskId,
    pub original_task: Option<Task>,
    pub optimistic_task: Option<Task>,
    /// Record timestamp (Unix ms)
    pub timestamp: i64,
    /// Label of the action that produced the tentative state
    pub action: String,
}
