//! Offline-first synchronization engine
//!
//! The engine applies mutations optimistically to local state, queues them
//! durably while unconfirmed, and reconciles the queue against the remote
//! store: detect whether each queued action is still safe, resolve conflicts
//! through a fixed policy table, and retry transient failures with bounded
//! attempts.

mod detect;
mod engine;
mod resolve;

#[cfg(test)]
pub(crate) mod testutil;

pub use detect::{detect_conflict, DetectedConflict};
pub use engine::{SyncEngine, TriggerHandle, SYNC_BATCH_SIZE};
pub use resolve::{can_merge_changes, resolve_conflict, resolve_permission};
