//! Conflict classification, resolution records, and drain results

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::pending_action::ActionId;
use crate::models::task::TaskId;

/// Why a queued action is unsafe to apply as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Someone else's write landed after the action was queued
    Version,
    /// The remote task no longer exists
    Deleted,
    /// The remote store rejected the caller's authorization
    Permission,
    /// The remote task is already in the state the action would produce
    State,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => write!(f, "version"),
            Self::Deleted => write!(f, "deleted"),
            Self::Permission => write!(f, "permission"),
            Self::State => write!(f, "state"),
        }
    }
}

/// Disposition of a detected conflict.
///
/// `Merge` and `ClientWins` both proceed to apply the action; `ServerWins`
/// and `Skip` both drop it without a remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    ServerWins,
    ClientWins,
    Merge,
    Skip,
}

impl Resolution {
    /// Whether the orchestrator should still apply the action remotely
    #[must_use]
    pub const fn applies_action(self) -> bool {
        matches!(self, Self::ClientWins | Self::Merge)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerWins => write!(f, "server_wins"),
            Self::ClientWins => write!(f, "client_wins"),
            Self::Merge => write!(f, "merge"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Recorded outcome of resolving one conflicted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub action_id: ActionId,
    pub task_id: Option<TaskId>,
    pub conflict_type: ConflictType,
    pub resolution: Resolution,
    /// Human-readable diagnostic, never parsed
    pub details: String,
}

/// Aggregate of one drain pass. Purely a return value; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub synced_count: usize,
    pub failed_count: usize,
    pub conflicts: Vec<ConflictResolution>,
    pub errors: Vec<String>,
}

impl SyncResult {
    /// A trivially successful result (e.g. nothing was queued)
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// A refused or aborted cycle: no partial progress was recorded
    #[must_use]
    pub fn refused(error: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
            ..Self::default()
        }
    }
}
