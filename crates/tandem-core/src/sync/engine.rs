//! Sync orchestrator
//!
//! Mutations are applied optimistically to the local cache, recorded in the
//! rollback ledger, and queued durably. When online they are sent through
//! immediately; otherwise a drain cycle replays the queue in enqueue order,
//! classifying and resolving conflicts per action and retrying transient
//! failures up to a bounded attempt count.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::models::{
    ActionPayload, ConflictResolution, PendingAction, SyncResult, Task, TaskChanges, TaskDraft,
    TaskId, TaskStatus, UserId,
};
use crate::net::NetworkMonitor;
use crate::remote::{RemoteError, RemoteStore};
use crate::store::StoreService;
use crate::sync::detect::detect_conflict;
use crate::sync::resolve::{resolve_conflict, resolve_permission};

/// Actions sent per batch within a drain cycle
pub const SYNC_BATCH_SIZE: usize = 10;

/// Ledger entries older than this are aged out after a drain, unless their
/// task still has queued work
const LEDGER_MAX_AGE_MS: i64 = 3_600_000;

/// Conflict records retained for status queries
const RECENT_CONFLICTS_CAP: usize = 100;

/// Which queued actions a drain cycle considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainScope {
    All,
    FailedOnly,
}

/// Offline-first sync engine over a local store, a remote store, and a
/// connectivity monitor.
///
/// Cloning is cheap; clones share the store and the drain lock.
#[derive(Clone)]
pub struct SyncEngine<R, N> {
    store: StoreService,
    remote: R,
    monitor: N,
    drain_lock: Arc<Mutex<()>>,
}

impl<R: RemoteStore, N: NetworkMonitor> SyncEngine<R, N> {
    pub fn new(store: StoreService, remote: R, monitor: N) -> Self {
        Self {
            store,
            remote,
            monitor,
            drain_lock: Arc::new(Mutex::new(())),
        }
    }

    // --- mutation API -------------------------------------------------------

    /// Create a task.
    ///
    /// Returns the server-assigned task when online, or an optimistic
    /// projection with a temporary id when offline.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        let local_id = TaskId::new();
        let optimistic = Task::from_draft(&draft, local_id, now_ms());
        let payload = ActionPayload::Create { draft, local_id };
        let synced = self
            .submit(payload, local_id, None, Some(optimistic.clone()))
            .await?;
        Ok(synced.unwrap_or(optimistic))
    }

    /// Apply a partial update to a cached task.
    pub async fn update_task(&self, task_id: &TaskId, changes: TaskChanges) -> Result<Task> {
        let original = self.require_cached(task_id).await?;
        let mut optimistic = original.clone();
        optimistic.apply_changes(&changes);
        optimistic.updated_at = now_ms();

        let payload = ActionPayload::Update {
            task_id: *task_id,
            changes,
        };
        let synced = self
            .submit(payload, *task_id, Some(original), Some(optimistic.clone()))
            .await?;
        Ok(synced.unwrap_or(optimistic))
    }

    /// Delete a task.
    pub async fn delete_task(&self, task_id: &TaskId) -> Result<()> {
        let original = self.require_cached(task_id).await?;
        let payload = ActionPayload::Delete { task_id: *task_id };
        self.submit(payload, *task_id, Some(original), None).await?;
        Ok(())
    }

    /// Assign an unassigned task to the given user.
    pub async fn claim_task(&self, task_id: &TaskId, user_id: UserId) -> Result<Task> {
        let original = self.require_cached(task_id).await?;
        if original.assigned_to.is_some() {
            return Err(Error::InvalidInput(format!(
                "task {task_id} is already assigned"
            )));
        }

        let mut optimistic = original.clone();
        optimistic.assigned_to = Some(user_id.clone());
        optimistic.updated_at = now_ms();

        let payload = ActionPayload::Claim {
            task_id: *task_id,
            user_id,
        };
        let synced = self
            .submit(payload, *task_id, Some(original), Some(optimistic.clone()))
            .await?;
        Ok(synced.unwrap_or(optimistic))
    }

    /// Mark a task done, crediting the completer.
    pub async fn complete_task(&self, task_id: &TaskId, user_id: UserId) -> Result<Task> {
        let original = self.require_cached(task_id).await?;
        if original.status == TaskStatus::Done {
            return Err(Error::InvalidInput(format!(
                "task {task_id} is already completed"
            )));
        }

        let now = now_ms();
        let mut optimistic = original.clone();
        optimistic.status = TaskStatus::Done;
        optimistic.assigned_to = Some(user_id.clone());
        optimistic.completed_at = Some(now);
        optimistic.updated_at = now;

        let payload = ActionPayload::Complete {
            task_id: *task_id,
            user_id,
        };
        let synced = self
            .submit(payload, *task_id, Some(original), Some(optimistic.clone()))
            .await?;
        Ok(synced.unwrap_or(optimistic))
    }

    /// Assign a task to a user, or clear its assignment.
    pub async fn assign_task(&self, task_id: &TaskId, assignee: Option<UserId>) -> Result<Task> {
        let original = self.require_cached(task_id).await?;
        if original.status == TaskStatus::Done {
            return Err(Error::InvalidInput(format!(
                "task {task_id} is completed and cannot be reassigned"
            )));
        }

        let mut optimistic = original.clone();
        optimistic.assigned_to = assignee.clone();
        optimistic.updated_at = now_ms();

        let payload = ActionPayload::Assign {
            task_id: *task_id,
            assignee,
        };
        let synced = self
            .submit(payload, *task_id, Some(original), Some(optimistic.clone()))
            .await?;
        Ok(synced.unwrap_or(optimistic))
    }

    async fn require_cached(&self, task_id: &TaskId) -> Result<Task> {
        self.store
            .get_cached_task(task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))
    }

    /// Shared mutation path: queue durably, record the rollback snapshot,
    /// project into the cache, then send through immediately when online.
    ///
    /// Returns `Some` with the server task when the remote store assigned one
    /// (create applied online), `None` otherwise.
    async fn submit(
        &self,
        payload: ActionPayload,
        task_id: TaskId,
        original: Option<Task>,
        optimistic: Option<Task>,
    ) -> Result<Option<Task>> {
        let action = self.store.enqueue_action(payload).await?;
        self.store
            .record_update(
                &task_id,
                original.as_ref(),
                optimistic.as_ref(),
                action.payload.kind(),
            )
            .await?;
        match &optimistic {
            Some(task) => self.store.upsert_task(task).await?,
            None => self.store.remove_task(&task_id).await?,
        }

        if !self.monitor.current_status().is_online() {
            tracing::debug!(
                "Offline, queued {} action {}",
                action.payload.kind(),
                action.id
            );
            return Ok(None);
        }

        match self.apply_remote(&action).await {
            Ok(server_task) => {
                self.store.dequeue_action(&action.id).await?;
                if let Some(server_task) = &server_task {
                    // A create's temporary projection gives way to the
                    // server-assigned document.
                    self.store.remove_task(&task_id).await?;
                    self.store.upsert_task(server_task).await?;
                }
                self.store.discard_update_for_task(&task_id).await?;
                Ok(server_task)
            }
            Err(error) => {
                // The durable record covered a crash between send and
                // response; once the failure is known the action is dropped
                // and the caller decides whether to retry.
                self.rollback_task(&task_id).await?;
                self.store.dequeue_action(&action.id).await?;
                Err(error.into())
            }
        }
    }

    /// Send one action to the remote store. Returns the server task for
    /// creates, `None` for everything else.
    async fn apply_remote(&self, action: &PendingAction) -> std::result::Result<Option<Task>, RemoteError> {
        match &action.payload {
            ActionPayload::Create { draft, .. } => {
                Ok(Some(self.remote.create_task(draft).await?))
            }
            ActionPayload::Update { task_id, changes } => {
                self.remote.update_task(task_id, changes).await?;
                Ok(None)
            }
            // Deleting an already-deleted task is the intended end state.
            ActionPayload::Delete { task_id } => match self.remote.delete_task(task_id).await {
                Ok(()) | Err(RemoteError::NotFound(_)) => Ok(None),
                Err(error) => Err(error),
            },
            ActionPayload::Claim { task_id, user_id } => {
                let changes = TaskChanges {
                    assigned_to: Some(Some(user_id.clone())),
                    ..TaskChanges::default()
                };
                self.remote.update_task(task_id, &changes).await?;
                Ok(None)
            }
            ActionPayload::Complete { task_id, user_id } => {
                self.remote.complete_task(task_id, user_id).await?;
                Ok(None)
            }
            ActionPayload::Assign { task_id, assignee } => {
                let changes = TaskChanges {
                    assigned_to: Some(assignee.clone()),
                    ..TaskChanges::default()
                };
                self.remote.update_task(task_id, &changes).await?;
                Ok(None)
            }
        }
    }

    /// Restore the pre-mutation snapshot for a task and drop its ledger entry.
    async fn rollback_task(&self, task_id: &TaskId) -> Result<()> {
        if let Some(entry) = self.store.rollback_update_for_task(task_id).await? {
            match entry.original_task {
                Some(original) => self.store.upsert_task(&original).await?,
                // No prior state: the optimistic projection was a create.
                None => self.store.remove_task(task_id).await?,
            }
        }
        Ok(())
    }

    // --- drain cycles -------------------------------------------------------

    /// Drain the full queue. Refused (not queued) when offline or when
    /// another drain is running.
    pub async fn drain(&self) -> Result<SyncResult> {
        self.run_cycle(DrainScope::All, false).await
    }

    /// Drain even when the queue is empty, refreshing the sync timestamp.
    pub async fn force_drain(&self) -> Result<SyncResult> {
        self.run_cycle(DrainScope::All, true).await
    }

    /// Drain only actions that have already failed at least once.
    pub async fn retry_failed(&self) -> Result<SyncResult> {
        self.run_cycle(DrainScope::FailedOnly, false).await
    }

    async fn run_cycle(&self, scope: DrainScope, force: bool) -> Result<SyncResult> {
        // At most one drain at a time; concurrent callers are refused rather
        // than queued so triggers never pile up.
        let Ok(_guard) = self.drain_lock.try_lock() else {
            return Ok(SyncResult::refused("Sync already in progress"));
        };

        if !self.monitor.current_status().is_online() {
            return Ok(SyncResult::refused("Device is offline"));
        }

        let mut actions = self.store.list_actions().await?;
        if scope == DrainScope::FailedOnly {
            actions.retain(|action| action.retry_count > 0);
        }
        if actions.is_empty() && !force {
            return Ok(SyncResult::succeeded());
        }

        tracing::info!("Draining {} queued action(s)", actions.len());

        let mut result = SyncResult::default();
        for batch in actions.chunks(SYNC_BATCH_SIZE) {
            for action in batch {
                self.process_action(action, &mut result).await?;
            }
        }
        result.success = result.failed_count == 0;

        if result.success {
            self.store.set_last_synced_at(now_ms()).await?;
        }

        // Age out stale ledger entries, sparing tasks with queued work.
        let queued: Vec<TaskId> = self
            .store
            .list_actions()
            .await?
            .iter()
            .filter_map(|action| ledger_task_id(&action.payload))
            .collect();
        self.store
            .cleanup_updates(LEDGER_MAX_AGE_MS, &queued)
            .await?;

        if !result.conflicts.is_empty() {
            self.store
                .append_conflicts(&result.conflicts, RECENT_CONFLICTS_CAP)
                .await?;
        }

        tracing::info!(
            "Drain finished: {} synced, {} failed, {} conflict(s)",
            result.synced_count,
            result.failed_count,
            result.conflicts.len()
        );
        Ok(result)
    }

    async fn process_action(&self, action: &PendingAction, result: &mut SyncResult) -> Result<()> {
        // A structurally invalid payload cannot succeed on retry.
        if let Err(error) = action.payload.validate() {
            self.rollback_and_dequeue(action).await?;
            result.failed_count += 1;
            result.errors.push(format!("action {}: {error}", action.id));
            return Ok(());
        }

        let mut merge_base = None;
        if let Some(conflict) = detect_conflict(&self.remote, action).await {
            let record = resolve_conflict(action, &conflict);
            let applies = record.resolution.applies_action();
            result.conflicts.push(record);
            if !applies {
                self.settle_conflicted(action, conflict.remote_task).await?;
                return Ok(());
            }
            merge_base = conflict.remote_task;
        }

        match self.apply_remote(action).await {
            Ok(server_task) => {
                self.store.dequeue_action(&action.id).await?;
                if let Some(task_id) = ledger_task_id(&action.payload) {
                    if let Some(server_task) = &server_task {
                        self.store.remove_task(&task_id).await?;
                        self.store.upsert_task(server_task).await?;
                    } else if let Some(merged) = merged_projection(&action.payload, merge_base) {
                        // Merge resolution: the cache reflects the partner's
                        // fields plus this client's content changes.
                        self.store.upsert_task(&merged).await?;
                    }
                    self.store.discard_update_for_task(&task_id).await?;
                }
                result.synced_count += 1;
            }
            Err(error @ RemoteError::PermissionDenied(_)) => {
                self.rollback_and_dequeue(action).await?;
                result.conflicts.push(resolve_permission(action, error.to_string()));
                result.failed_count += 1;
                result.errors.push(format!("action {}: {error}", action.id));
            }
            Err(error) if error.is_transient() => {
                result.failed_count += 1;
                if action.is_last_attempt() {
                    tracing::warn!(
                        "Abandoning action {} after {} attempt(s): {error}",
                        action.id,
                        action.retry_count + 1
                    );
                    self.rollback_and_dequeue(action).await?;
                    result.errors.push(format!(
                        "action {} abandoned after {} attempt(s): {error}",
                        action.id,
                        action.retry_count + 1
                    ));
                } else {
                    self.store.increment_retry(&action.id).await?;
                    result
                        .errors
                        .push(format!("action {} will retry: {error}", action.id));
                }
            }
            Err(error) => {
                self.rollback_and_dequeue(action).await?;
                result.failed_count += 1;
                result.errors.push(format!("action {}: {error}", action.id));
            }
        }
        Ok(())
    }

    /// Settle an action the server won: the cache adopts the remote document
    /// (or drops the task entirely) and the action leaves the queue.
    async fn settle_conflicted(
        &self,
        action: &PendingAction,
        remote_task: Option<Task>,
    ) -> Result<()> {
        if let Some(task_id) = ledger_task_id(&action.payload) {
            match remote_task {
                Some(task) => self.store.upsert_task(&task).await?,
                None => self.store.remove_task(&task_id).await?,
            }
            self.store.discard_update_for_task(&task_id).await?;
        }
        self.store.dequeue_action(&action.id).await?;
        Ok(())
    }

    async fn rollback_and_dequeue(&self, action: &PendingAction) -> Result<()> {
        if let Some(task_id) = ledger_task_id(&action.payload) {
            self.rollback_task(&task_id).await?;
        }
        self.store.dequeue_action(&action.id).await?;
        Ok(())
    }

    // --- status -------------------------------------------------------------

    /// Number of queued actions.
    pub async fn pending_count(&self) -> Result<usize> {
        self.store.pending_count().await
    }

    /// Number of unconfirmed optimistic mutations.
    pub async fn optimistic_count(&self) -> Result<usize> {
        self.store.optimistic_count().await
    }

    /// Timestamp of the last fully successful drain, if any.
    pub async fn last_synced_at(&self) -> Result<Option<i64>> {
        self.store.last_synced_at().await
    }

    /// Conflict records from recent drains, oldest first. Persisted in the
    /// local store, so the history survives restarts.
    pub async fn recent_conflicts(&self) -> Result<Vec<ConflictResolution>> {
        self.store.recent_conflicts().await
    }

    /// The locally cached task list, optimistic projections included.
    pub async fn cached_tasks(&self) -> Result<Vec<Task>> {
        self.store.load_tasks().await
    }

    /// Whether the monitor currently reports the device online.
    pub fn is_online(&self) -> bool {
        self.monitor.current_status().is_online()
    }
}

impl<R, N> SyncEngine<R, N>
where
    R: RemoteStore + Clone + Send + Sync + 'static,
    N: NetworkMonitor + Clone + Send + Sync + 'static,
{
    /// Drain on a fixed interval until the handle is dropped.
    pub fn spawn_periodic(&self, interval: Duration) -> TriggerHandle {
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval fires immediately; the first drain waits a full period
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match engine.drain().await {
                    Ok(result) if !result.success => {
                        tracing::debug!("Periodic sync incomplete: {:?}", result.errors);
                    }
                    Ok(_) => {}
                    Err(error) => tracing::warn!("Periodic sync failed: {error}"),
                }
            }
        });
        TriggerHandle { handle }
    }

    /// Drain shortly after each offline-to-online transition until the handle
    /// is dropped. The debounce lets flapping connectivity settle first.
    pub fn spawn_reconnect_watcher(&self, debounce: Duration) -> TriggerHandle {
        let engine = self.clone();
        let mut rx = self.monitor.subscribe();
        let handle = tokio::spawn(async move {
            let mut was_online = rx.borrow().is_online();
            while rx.changed().await.is_ok() {
                let online = rx.borrow().is_online();
                if online && !was_online {
                    tokio::time::sleep(debounce).await;
                    match engine.drain().await {
                        Ok(result) if !result.success => {
                            tracing::debug!("Reconnect sync incomplete: {:?}", result.errors);
                        }
                        Ok(_) => {}
                        Err(error) => tracing::warn!("Reconnect sync failed: {error}"),
                    }
                }
                was_online = online;
            }
        });
        TriggerHandle { handle }
    }
}

/// Handle to a background sync trigger; dropping it stops the trigger.
pub struct TriggerHandle {
    handle: JoinHandle<()>,
}

impl Drop for TriggerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Ledger key for an action: creates are keyed by their temporary local id.
fn ledger_task_id(payload: &ActionPayload) -> Option<TaskId> {
    match payload {
        ActionPayload::Create { local_id, .. } => Some(*local_id),
        _ => payload.task_id().copied(),
    }
}

/// For a merged update, project this client's changes over the remote task.
fn merged_projection(payload: &ActionPayload, merge_base: Option<Task>) -> Option<Task> {
    let mut base = merge_base?;
    if let ActionPayload::Update { changes, .. } = payload {
        base.apply_changes(changes);
        return Some(base);
    }
    None
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
