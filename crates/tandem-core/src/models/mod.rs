//! Data models for Tandem

mod conflict;
mod optimistic_update;
mod pending_action;
mod task;

pub use conflict::{ConflictResolution, ConflictType, Resolution, SyncResult};
pub use optimistic_update::{OptimisticUpdate, UpdateId};
pub use pending_action::{ActionId, ActionPayload, PendingAction, DEFAULT_MAX_RETRIES};
pub use task::{PartnershipId, Task, TaskChanges, TaskDraft, TaskId, TaskStatus, UserId};
