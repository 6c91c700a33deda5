//! Conflict detection
//!
//! Given a queued action and the current remote task, classify whether
//! applying the action is still safe. Classification is deterministic for a
//! fixed action/remote pair; there is no hidden state.

use crate::models::{ActionPayload, ConflictType, PendingAction, Task, TaskStatus};
use crate::remote::RemoteStore;

/// A detected mismatch between an action's assumptions and remote state
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedConflict {
    pub conflict_type: ConflictType,
    /// Current remote task, when one exists
    pub remote_task: Option<Task>,
    /// Human-readable diagnostic
    pub details: String,
}

/// Classify a queued action against the current remote task.
///
/// Returns `None` when the action is safe to apply. A remote fetch failure
/// also returns `None`: the action proceeds and the remote store's own write
/// semantics are the final arbiter. This favors availability over perfect
/// safety and is a deliberate trade-off, not a bug.
pub async fn detect_conflict<R: RemoteStore>(
    remote: &R,
    action: &PendingAction,
) -> Option<DetectedConflict> {
    // Creates never conflict: there is no prior remote state to compare.
    let task_id = action.payload.task_id()?;

    let remote_task = match remote.get_task(task_id).await {
        Ok(task) => task,
        Err(error) => {
            tracing::warn!(
                "Conflict detection fetch failed for task {task_id}, proceeding without: {error}"
            );
            return None;
        }
    };

    let Some(remote_task) = remote_task else {
        if matches!(action.payload, ActionPayload::Delete { .. }) {
            return None;
        }
        return Some(DetectedConflict {
            conflict_type: ConflictType::Deleted,
            remote_task: None,
            details: format!("task {task_id} no longer exists on the server"),
        });
    };

    if remote_task.updated_at > action.timestamp {
        return Some(DetectedConflict {
            conflict_type: ConflictType::Version,
            details: format!(
                "task {task_id} changed on the server at {} after this action was queued at {}",
                remote_task.updated_at, action.timestamp
            ),
            remote_task: Some(remote_task),
        });
    }

    match &action.payload {
        ActionPayload::Complete { .. } if remote_task.status == TaskStatus::Done => {
            Some(DetectedConflict {
                conflict_type: ConflictType::State,
                details: format!("task {task_id} is already completed"),
                remote_task: Some(remote_task),
            })
        }
        ActionPayload::Claim { .. } if remote_task.assigned_to.is_some() => {
            let holder = remote_task
                .assigned_to
                .as_ref()
                .map_or_else(String::new, ToString::to_string);
            Some(DetectedConflict {
                conflict_type: ConflictType::State,
                details: format!("task {task_id} is already assigned to {holder}"),
                remote_task: Some(remote_task),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActionId, PartnershipId, TaskChanges, TaskDraft, TaskId, UserId, DEFAULT_MAX_RETRIES,
    };
    use crate::sync::testutil::FakeRemote;
    use pretty_assertions::assert_eq;

    fn remote_task(assigned: Option<&str>, status: TaskStatus) -> Task {
        let draft = TaskDraft {
            title: "Water plants".to_string(),
            description: String::new(),
            category: "home".to_string(),
            due_date: None,
            created_by: UserId::new("alice"),
            partnership_id: PartnershipId::new("pair-1"),
        };
        let mut task = Task::from_draft(&draft, TaskId::new(), 1000);
        task.status = status;
        task.assigned_to = assigned.map(UserId::new);
        if status == TaskStatus::Done {
            task.completed_at = Some(1500);
        }
        task
    }

    fn action(payload: ActionPayload) -> PendingAction {
        PendingAction {
            id: ActionId::new(),
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_never_conflicts() {
        let remote = FakeRemote::new();
        let draft = TaskDraft {
            title: "New".to_string(),
            description: String::new(),
            category: String::new(),
            due_date: None,
            created_by: UserId::new("alice"),
            partnership_id: PartnershipId::new("pair-1"),
        };
        let action = action(ActionPayload::Create {
            draft,
            local_id: TaskId::new(),
        });
        assert_eq!(detect_conflict(&remote, &action).await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_remote_task_is_deleted_conflict() {
        let remote = FakeRemote::new();
        let action = action(ActionPayload::Update {
            task_id: TaskId::new(),
            changes: TaskChanges {
                title: Some("x".to_string()),
                ..TaskChanges::default()
            },
        });

        let conflict = detect_conflict(&remote, &action).await.unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Deleted);
        assert_eq!(conflict.remote_task, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_remote_task_does_not_conflict_with_delete() {
        let remote = FakeRemote::new();
        let action = action(ActionPayload::Delete {
            task_id: TaskId::new(),
        });
        assert_eq!(detect_conflict(&remote, &action).await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_newer_remote_write_is_version_conflict() {
        let remote = FakeRemote::new();
        let task = remote_task(None, TaskStatus::Todo);
        remote.insert_task(task.clone());
        remote.set_updated_at(&task.id, chrono::Utc::now().timestamp_millis() + 60_000);

        let action = action(ActionPayload::Update {
            task_id: task.id,
            changes: TaskChanges {
                description: Some("v2".to_string()),
                ..TaskChanges::default()
            },
        });

        let conflict = detect_conflict(&remote, &action).await.unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Version);
        assert!(conflict.remote_task.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_complete_against_done_task_is_state_conflict() {
        let remote = FakeRemote::new();
        let task = remote_task(Some("alice"), TaskStatus::Done);
        remote.insert_task(task.clone());

        let action = action(ActionPayload::Complete {
            task_id: task.id,
            user_id: UserId::new("bob"),
        });

        let conflict = detect_conflict(&remote, &action).await.unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::State);
        assert!(conflict.details.contains("already completed"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_claim_against_assigned_task_is_state_conflict() {
        let remote = FakeRemote::new();
        let task = remote_task(Some("alice"), TaskStatus::InProgress);
        remote.insert_task(task.clone());

        let action = action(ActionPayload::Claim {
            task_id: task.id,
            user_id: UserId::new("bob"),
        });

        let conflict = detect_conflict(&remote, &action).await.unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::State);
        assert!(conflict.details.contains("already assigned"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_failure_reads_as_no_conflict() {
        let remote = FakeRemote::new();
        remote.set_fail_get(true);

        let action = action(ActionPayload::Delete {
            task_id: TaskId::new(),
        });
        assert_eq!(detect_conflict(&remote, &action).await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_classification_is_deterministic() {
        let remote = FakeRemote::new();
        let task = remote_task(Some("alice"), TaskStatus::InProgress);
        remote.insert_task(task.clone());

        let action = action(ActionPayload::Claim {
            task_id: task.id,
            user_id: UserId::new("bob"),
        });

        let first = detect_conflict(&remote, &action).await.unwrap();
        let second = detect_conflict(&remote, &action).await.unwrap();
        assert_eq!(first, second);
    }
}
