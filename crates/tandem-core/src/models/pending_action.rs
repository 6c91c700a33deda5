//! Pending action model
//!
//! A pending action is a durable record of a mutation that has not yet been
//! confirmed by the remote store. Payloads are a tagged union keyed by the
//! action type; each variant carries its own field set and is validated at
//! enqueue time so a structurally invalid payload never reaches a drain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::task::{TaskChanges, TaskDraft, TaskId, TaskStatus, UserId};

/// Default number of remote attempts before an action is abandoned
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A unique identifier for a pending action, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(Uuid);

impl ActionId {
    /// Create a new unique action ID using UUID v7
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

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Type-specific payload of a queued mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Create a new task. `local_id` is the temporary id of the optimistic
    /// projection, replaced by the server-assigned task on acceptance.
    Create { draft: TaskDraft, local_id: TaskId },
    /// Partially update a task's fields
    Update {
        task_id: TaskId,
        changes: TaskChanges,
    },
    /// Delete a task
    Delete { task_id: TaskId },
    /// Assign an unassigned task to oneself
    Claim { task_id: TaskId, user_id: UserId },
    /// Mark a task done, crediting the completer
    Complete { task_id: TaskId, user_id: UserId },
    /// Assign a task to a user, or clear the assignment
    Assign {
        task_id: TaskId,
        assignee: Option<UserId>,
    },
}

impl ActionPayload {
    /// Stable lowercase name of the action type
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Claim { .. } => "claim",
            Self::Complete { .. } => "complete",
            Self::Assign { .. } => "assign",
        }
    }

    /// Target task, `None` only for `create` (no prior remote state exists)
    #[must_use]
    pub const fn task_id(&self) -> Option<&TaskId> {
        match self {
            Self::Create { .. } => None,
            Self::Update { task_id, .. }
            | Self::Delete { task_id }
            | Self::Claim { task_id, .. }
            | Self::Complete { task_id, .. }
            | Self::Assign { task_id, .. } => Some(task_id),
        }
    }

    /// Validate the payload's field set.
    ///
    /// Rejected payloads never reach the queue; retrying a structurally
    /// invalid payload cannot succeed.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Create { draft, .. } => {
                if draft.title.trim().is_empty() {
                    return Err(Error::InvalidInput(
                        "create payload requires a non-empty title".to_string(),
                    ));
                }
                if draft.created_by.is_empty() {
                    return Err(Error::InvalidInput(
                        "create payload requires a creator".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Update { changes, .. } => {
                if changes.is_empty() {
                    return Err(Error::InvalidInput(
                        "update payload carries no changes".to_string(),
                    ));
                }
                if changes
                    .title
                    .as_deref()
                    .is_some_and(|title| title.trim().is_empty())
                {
                    return Err(Error::InvalidInput(
                        "update payload cannot blank the title".to_string(),
                    ));
                }
                // Completion is a dedicated action so the remote store can
                // credit the completer transactionally.
                if changes.status == Some(TaskStatus::Done) {
                    return Err(Error::InvalidInput(
                        "update payload cannot set status to done; use complete".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Claim { user_id, .. } | Self::Complete { user_id, .. } => {
                if user_id.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "{} payload requires a user id",
                        self.kind()
                    )));
                }
                Ok(())
            }
            Self::Assign { assignee, .. } => {
                if assignee.as_ref().is_some_and(UserId::is_empty) {
                    return Err(Error::InvalidInput(
                        "assign payload requires a non-empty assignee".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Delete { .. } => Ok(()),
        }
    }
}

/// A queued, durable record of an unconfirmed mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Locally generated unique identifier
    pub id: ActionId,
    /// Type-specific payload
    pub payload: ActionPayload,
    /// Client clock at enqueue time (Unix ms)
    pub timestamp: i64,
    /// Remote attempts that have failed so far
    pub retry_count: u32,
    /// Attempts allowed before the action is abandoned
    pub max_retries: u32,
}

impl PendingAction {
    /// Whether one more failed attempt exhausts this action's retries
    #[must_use]
    pub const fn is_last_attempt(&self) -> bool {
        self.retry_count + 1 >= self.max_retries
    }
}
