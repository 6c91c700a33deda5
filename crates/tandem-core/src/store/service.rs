//! Shared store service wrapper used across clients.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{
    ActionId, ActionPayload, ConflictResolution, OptimisticUpdate, PendingAction, Task, TaskId,
    UpdateId,
};
use crate::store::{ActionQueue, CacheStore, SqliteActionQueue, SqliteUpdateLedger, Store, UpdateLedger};

/// Cache key holding the durable task list projection
const TASKS_KEY: &str = "tasks";
/// Cache key holding the last successful drain timestamp
const LAST_SYNCED_KEY: &str = "last_synced_at";
/// Cache key holding recently resolved conflict records
const CONFLICTS_KEY: &str = "recent_conflicts";

/// Thread-safe service for store and repository operations.
#[derive(Clone)]
pub struct StoreService {
    store: Arc<Mutex<Store>>,
}

impl StoreService {
    /// Open a store service at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let store = Store::open(db_path.into())?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
        })
    }

    /// Open an in-memory store service (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: Arc::new(Mutex::new(Store::open_in_memory()?)),
        })
    }

    // --- task cache -------------------------------------------------------

    /// Load the cached task list; absent or corrupt reads as empty.
    pub async fn load_tasks(&self) -> Result<Vec<Task>> {
        let store = self.store.lock().await;
        let cache = CacheStore::new(store.connection());
        Ok(cache.get(TASKS_KEY)?.unwrap_or_default())
    }

    /// Replace the cached task list.
    pub async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        let store = self.store.lock().await;
        let cache = CacheStore::new(store.connection());
        cache.set(TASKS_KEY, &tasks, None)
    }

    /// Insert or replace one task in the cached list.
    pub async fn upsert_task(&self, task: &Task) -> Result<()> {
        let store = self.store.lock().await;
        let cache = CacheStore::new(store.connection());
        let mut tasks: Vec<Task> = cache.get(TASKS_KEY)?.unwrap_or_default();
        if let Some(existing) = tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task.clone();
        } else {
            tasks.push(task.clone());
        }
        cache.set(TASKS_KEY, &tasks, None)
    }

    /// Remove one task from the cached list; absent ids are a no-op.
    pub async fn remove_task(&self, task_id: &TaskId) -> Result<()> {
        let store = self.store.lock().await;
        let cache = CacheStore::new(store.connection());
        let mut tasks: Vec<Task> = cache.get(TASKS_KEY)?.unwrap_or_default();
        tasks.retain(|t| &t.id != task_id);
        cache.set(TASKS_KEY, &tasks, None)
    }

    /// Fetch one task from the cached list.
    pub async fn get_cached_task(&self, task_id: &TaskId) -> Result<Option<Task>> {
        Ok(self
            .load_tasks()
            .await?
            .into_iter()
            .find(|t| &t.id == task_id))
    }

    // --- pending action queue ----------------------------------------------

    /// Validate and append an action to the durable queue.
    pub async fn enqueue_action(&self, payload: ActionPayload) -> Result<PendingAction> {
        let store = self.store.lock().await;
        SqliteActionQueue::new(store.connection()).enqueue(payload)
    }

    /// Remove an action from the queue (idempotent).
    pub async fn dequeue_action(&self, id: &ActionId) -> Result<()> {
        let store = self.store.lock().await;
        SqliteActionQueue::new(store.connection()).dequeue(id)
    }

    /// All queued actions in enqueue order.
    pub async fn list_actions(&self) -> Result<Vec<PendingAction>> {
        let store = self.store.lock().await;
        SqliteActionQueue::new(store.connection()).list()
    }

    /// Bump an action's retry count.
    pub async fn increment_retry(&self, id: &ActionId) -> Result<()> {
        let store = self.store.lock().await;
        SqliteActionQueue::new(store.connection()).increment_retry(id)
    }

    /// Number of queued actions.
    pub async fn pending_count(&self) -> Result<usize> {
        let store = self.store.lock().await;
        SqliteActionQueue::new(store.connection()).count()
    }

    // --- optimistic update ledger -------------------------------------------

    /// Record a tentative mutation in the ledger.
    pub async fn record_update(
        &self,
        task_id: &TaskId,
        original: Option<&Task>,
        optimistic: Option<&Task>,
        action: &str,
    ) -> Result<UpdateId> {
        let store = self.store.lock().await;
        SqliteUpdateLedger::new(store.connection()).record(task_id, original, optimistic, action)
    }

    /// Drop a ledger entry after remote confirmation.
    pub async fn discard_update(&self, id: &UpdateId) -> Result<()> {
        let store = self.store.lock().await;
        SqliteUpdateLedger::new(store.connection()).discard(id)
    }

    /// Drop a task's ledger entry after remote confirmation.
    pub async fn discard_update_for_task(&self, task_id: &TaskId) -> Result<()> {
        let store = self.store.lock().await;
        SqliteUpdateLedger::new(store.connection()).discard_for_task(task_id)
    }

    /// Atomically read and remove a ledger entry.
    pub async fn rollback_update(&self, id: &UpdateId) -> Result<Option<OptimisticUpdate>> {
        let store = self.store.lock().await;
        SqliteUpdateLedger::new(store.connection()).rollback(id)
    }

    /// Atomically read and remove a task's ledger entry.
    pub async fn rollback_update_for_task(
        &self,
        task_id: &TaskId,
    ) -> Result<Option<OptimisticUpdate>> {
        let store = self.store.lock().await;
        SqliteUpdateLedger::new(store.connection()).rollback_for_task(task_id)
    }

    /// Number of live ledger entries.
    pub async fn optimistic_count(&self) -> Result<usize> {
        let store = self.store.lock().await;
        SqliteUpdateLedger::new(store.connection()).count()
    }

    /// Age out stale ledger entries, sparing tasks with queued actions.
    pub async fn cleanup_updates(&self, max_age_ms: i64, keep_tasks: &[TaskId]) -> Result<usize> {
        let store = self.store.lock().await;
        SqliteUpdateLedger::new(store.connection()).cleanup(max_age_ms, keep_tasks)
    }

    // --- sync bookkeeping ----------------------------------------------------

    /// Record the timestamp of the last successful drain.
    pub async fn set_last_synced_at(&self, timestamp_ms: i64) -> Result<()> {
        let store = self.store.lock().await;
        CacheStore::new(store.connection()).set(LAST_SYNCED_KEY, &timestamp_ms, None)
    }

    /// Timestamp of the last successful drain, if any.
    pub async fn last_synced_at(&self) -> Result<Option<i64>> {
        let store = self.store.lock().await;
        CacheStore::new(store.connection()).get(LAST_SYNCED_KEY)
    }

    /// Append resolved conflict records, keeping at most `cap`, oldest first.
    pub async fn append_conflicts(&self, new: &[ConflictResolution], cap: usize) -> Result<()> {
        let store = self.store.lock().await;
        let cache = CacheStore::new(store.connection());
        let mut all: Vec<ConflictResolution> = cache.get(CONFLICTS_KEY)?.unwrap_or_default();
        all.extend_from_slice(new);
        if all.len() > cap {
            let excess = all.len() - cap;
            all.drain(..excess);
        }
        cache.set(CONFLICTS_KEY, &all, None)
    }

    /// Recently resolved conflict records; absent or corrupt reads as empty.
    pub async fn recent_conflicts(&self) -> Result<Vec<ConflictResolution>> {
        let store = self.store.lock().await;
        let cache = CacheStore::new(store.connection());
        Ok(cache.get(CONFLICTS_KEY)?.unwrap_or_default())
    }
}
