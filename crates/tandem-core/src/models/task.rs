//! Task model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a task, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID using UUID v7
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

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A stable user identity supplied by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider-issued user identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty after trimming
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the pairing of two users who share a task list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnershipId(String);

impl PartnershipId {
    /// Wrap a partnership identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartnershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A task shared between two paired users
///
/// `updated_at` is advanced by the remote store on every accepted write and
/// is the sole authority for freshness. Invariant: `status == Done` implies
/// `assigned_to` is the completer and `completed_at` is set; an unassigned
/// task is never `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Short title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// User-defined category label
    #[serde(default)]
    pub category: String,
    /// Lifecycle status
    pub status: TaskStatus,
    /// User the task is assigned to, if any
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    /// Due date (Unix ms)
    #[serde(default)]
    pub due_date: Option<i64>,
    /// Completion timestamp (Unix ms), set when status becomes done
    #[serde(default)]
    pub completed_at: Option<i64>,
    /// Creator (immutable after creation)
    pub created_by: UserId,
    /// Owning partnership (immutable after creation)
    pub partnership_id: PartnershipId,
    /// Creation timestamp (Unix ms, immutable)
    pub created_at: i64,
    /// Last update timestamp (Unix ms), stamped by the remote store
    pub updated_at: i64,
}

impl Task {
    /// Materialize a task from a draft with a locally generated id.
    ///
    /// Used for the optimistic projection of a `create` action; the remote
    /// store assigns the authoritative id and timestamps on acceptance.
    #[must_use]
    pub fn from_draft(draft: &TaskDraft, id: TaskId, now_ms: i64) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            status: TaskStatus::Todo,
            assigned_to: None,
            due_date: draft.due_date,
            completed_at: None,
            created_by: draft.created_by.clone(),
            partnership_id: draft.partnership_id.clone(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Apply a partial change set to this task, leaving untouched fields as-is.
    pub fn apply_changes(&mut self, changes: &TaskChanges) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &changes.description {
            self.description.clone_from(description);
        }
        if let Some(category) = &changes.category {
            self.category.clone_from(category);
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(assigned_to) = &changes.assigned_to {
            self.assigned_to.clone_from(assigned_to);
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
    }

    /// Check the done/assignment invariant.
    #[must_use]
    pub const fn invariant_holds(&self) -> bool {
        match self.status {
            TaskStatus::Done => self.assigned_to.is_some() && self.completed_at.is_some(),
            TaskStatus::Todo | TaskStatus::InProgress => true,
        }
    }
}

/// Fields required to create a new task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub due_date: Option<i64>,
    pub created_by: UserId,
    pub partnership_id: PartnershipId,
}

/// A partial update to a task.
///
/// Absent fields are left untouched. `assigned_to` and `due_date` distinguish
/// "not present" from "present and null" so an update can explicitly clear
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub assigned_to: Option<Option<UserId>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub due_date: Option<Option<i64>>,
}

impl TaskChanges {
    /// Whether the change set carries no fields at all
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
    }

    /// Whether the change set touches only title/description/category
    #[must_use]
    pub const fn touches_only_content_fields(&self) -> bool {
        self.status.is_none() && self.assigned_to.is_none() && self.due_date.is_none()
    }
}

/// Deserialize `Option<Option<T>>` so that an explicit JSON `null` becomes
/// `Some(None)` instead of `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn draft() -> TaskDraft {
        TaskDraft {
            title: "Buy milk".to_string(),
            description: String::new(),
            category: "shopping".to_string(),
            due_date: None,
            created_by: UserId::new("alice"),
            partnership_id: PartnershipId::new("pair-1"),
        }
    }

    #[test]
    fn test_task_id_unique() {
        let id1 = TaskId::new();
        let id2 = TaskId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_task_id_parse() {
        let id = TaskId::new();
        let parsed: TaskId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_from_draft_starts_todo_unassigned() {
        let task = Task::from_draft(&draft(), TaskId::new(), 1000);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.assigned_to, None);
        assert_eq!(task.created_at, 1000);
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.invariant_holds());
    }

    #[test]
    fn test_apply_changes_leaves_absent_fields() {
        let mut task = Task::from_draft(&draft(), TaskId::new(), 1000);
        task.apply_changes(&TaskChanges {
            description: Some("2 liters".to_string()),
            ..TaskChanges::default()
        });
        assert_eq!(task.description, "2 liters");
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.category, "shopping");
    }

    #[test]
    fn test_apply_changes_can_clear_due_date() {
        let mut task = Task::from_draft(&draft(), TaskId::new(), 1000);
        task.due_date = Some(5000);
        task.apply_changes(&TaskChanges {
            due_date: Some(None),
            ..TaskChanges::default()
        });
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_invariant_rejects_done_without_completion() {
        let mut task = Task::from_draft(&draft(), TaskId::new(), 1000);
        task.status = TaskStatus::Done;
        assert!(!task.invariant_holds());

        task.assigned_to = Some(UserId::new("alice"));
        task.completed_at = Some(2000);
        assert!(task.invariant_holds());
    }

    #[test]
    fn test_changes_explicit_null_deserializes_to_some_none() {
        let changes: TaskChanges = serde_json::from_str(r#"{"assigned_to": null}"#).unwrap();
        assert_eq!(changes.assigned_to, Some(None));

        let absent: TaskChanges = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.assigned_to, None);
    }

    #[test]
    fn test_changes_content_field_detection() {
        let content_only = TaskChanges {
            title: Some("x".to_string()),
            ..TaskChanges::default()
        };
        assert!(content_only.touches_only_content_fields());

        let status_change = TaskChanges {
            status: Some(TaskStatus::Done),
            ..TaskChanges::default()
        };
        assert!(!status_change.touches_only_content_fields());

        assert!(TaskChanges::default().is_empty());
        assert!(!content_only.is_empty());
    }
}
