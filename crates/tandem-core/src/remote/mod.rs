//! Remote authoritative store contract
//!
//! The remote store is an external collaborator behind a narrow trait. It
//! stamps `updated_at` on every accepted write; that timestamp is the sole
//! cross-client ordering signal the conflict detector consumes.

mod http;

pub use http::HttpRemoteStore;

use std::future::Future;

use thiserror::Error;

use crate::models::{Task, TaskChanges, TaskDraft, TaskId, UserId};

/// Errors from remote store operations, classified per the retry taxonomy
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network unreachable or the request never completed
    #[error("remote request failed: {0}")]
    Network(String),
    /// The store reported itself unavailable (retryable)
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    /// The call exceeded its deadline (retryable)
    #[error("remote deadline exceeded: {0}")]
    DeadlineExceeded(String),
    /// The store aborted the operation, e.g. a transaction collision (retryable)
    #[error("remote operation aborted: {0}")]
    Aborted(String),
    /// Authorization rejected; never retried
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The target document does not exist
    #[error("remote task not found: {0}")]
    NotFound(String),
    /// The store rejected the request as malformed
    #[error("remote rejected request: {0}")]
    Invalid(String),
}

impl RemoteError {
    /// Whether the failure is transient and the action should stay queued
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Unavailable(_) | Self::DeadlineExceeded(_) | Self::Aborted(_)
        )
    }
}

/// Result type for remote store operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Narrow contract consumed from the remote authoritative store.
///
/// Futures are `Send` so the sync engine can run drains on spawned tasks.
pub trait RemoteStore {
    /// Fetch the current task document, `Ok(None)` when absent
    fn get_task(&self, id: &TaskId) -> impl Future<Output = RemoteResult<Option<Task>>> + Send;

    /// Create a task; the store assigns the id and timestamps
    fn create_task(&self, draft: &TaskDraft) -> impl Future<Output = RemoteResult<Task>> + Send;

    /// Apply a partial update; the store stamps `updated_at`
    fn update_task(
        &self,
        id: &TaskId,
        changes: &TaskChanges,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Delete a task
    fn delete_task(&self, id: &TaskId) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Mark a task done and credit the completer's points.
    ///
    /// The backing store must run this as one transaction: either the status
    /// change and the point credit both commit, or neither does.
    fn complete_task(
        &self,
        id: &TaskId,
        user_id: &UserId,
    ) -> impl Future<Output = RemoteResult<()>> + Send;
}
