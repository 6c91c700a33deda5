//! Conflict resolution policy
//!
//! The policy is a fixed table, not a pluggable strategy. Both users of a
//! partnership run the same binary, so a deterministic table keeps their
//! replicas converging without coordination.

use crate::models::{ActionPayload, ConflictResolution, ConflictType, PendingAction, Resolution};
use crate::sync::detect::DetectedConflict;

/// Whether a queued action's changes are safe to replay over a newer remote
/// write.
///
/// Only content-field updates (title, description, category) qualify. Status,
/// assignment, and due-date changes reflect decisions made against stale
/// state, so they defer to the server instead.
#[must_use]
pub fn can_merge_changes(action: &PendingAction) -> bool {
    match &action.payload {
        ActionPayload::Update { changes, .. } => changes.touches_only_content_fields(),
        _ => false,
    }
}

/// Resolve a detected conflict into a disposition record.
pub fn resolve_conflict(action: &PendingAction, conflict: &DetectedConflict) -> ConflictResolution {
    let resolution = match conflict.conflict_type {
        ConflictType::Deleted => Resolution::Skip,
        ConflictType::State | ConflictType::Permission => Resolution::ServerWins,
        ConflictType::Version => {
            if can_merge_changes(action) {
                Resolution::Merge
            } else {
                Resolution::ServerWins
            }
        }
    };

    tracing::info!(
        "Resolved {} conflict on action {} as {resolution}: {}",
        conflict.conflict_type,
        action.id,
        conflict.details
    );

    ConflictResolution {
        action_id: action.id,
        task_id: action.payload.task_id().copied(),
        conflict_type: conflict.conflict_type,
        resolution,
        details: conflict.details.clone(),
    }
}

/// Record a permission rejection surfaced by the remote write itself.
///
/// Permission conflicts never come out of detection; the remote store is the
/// only party that can rule on authorization.
pub fn resolve_permission(action: &PendingAction, details: impl Into<String>) -> ConflictResolution {
    ConflictResolution {
        action_id: action.id,
        task_id: action.payload.task_id().copied(),
        conflict_type: ConflictType::Permission,
        resolution: Resolution::ServerWins,
        details: details.into(),
    }
}
