//! In-memory remote store fake for sync tests.
//!
//! The fake's clock starts far below real wall-clock milliseconds, so a
//! freshly inserted server task never reads as newer than an action queued
//! with a real `now` timestamp. Tests that want a version conflict bump
//! `updated_at` explicitly with [`FakeRemote::set_updated_at`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::models::{Task, TaskChanges, TaskDraft, TaskId, TaskStatus, UserId};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};

/// Which error the next write operations should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    Unavailable,
    PermissionDenied,
}

impl WriteFailure {
    fn to_error(self) -> RemoteError {
        match self {
            Self::Unavailable => RemoteError::Unavailable("fake outage".to_string()),
            Self::PermissionDenied => {
                RemoteError::PermissionDenied("fake rejection".to_string())
            }
        }
    }
}

struct Inner {
    tasks: Mutex<HashMap<String, Task>>,
    clock: AtomicI64,
    fail_get: AtomicBool,
    write_failure: Mutex<Option<WriteFailure>>,
    /// When set, `get_task` parks on this until notified. Lets a test hold a
    /// drain mid-cycle to exercise the at-most-one-drain guard.
    gate: Mutex<Option<Arc<Notify>>>,
}

#[derive(Clone)]
pub struct FakeRemote {
    inner: Arc<Inner>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(HashMap::new()),
                clock: AtomicI64::new(1_000_000),
                fail_get: AtomicBool::new(false),
                write_failure: Mutex::new(None),
                gate: Mutex::new(None),
            }),
        }
    }

    fn tick(&self) -> i64 {
        self.inner.clock.fetch_add(1000, Ordering::SeqCst)
    }

    pub fn insert_task(&self, task: Task) {
        self.inner
            .tasks
            .lock()
            .unwrap()
            .insert(task.id.as_str(), task);
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.inner.tasks.lock().unwrap().get(&id.as_str()).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.inner.tasks.lock().unwrap().len()
    }

    pub fn remove_task(&self, id: &TaskId) {
        self.inner.tasks.lock().unwrap().remove(&id.as_str());
    }

    pub fn set_updated_at(&self, id: &TaskId, updated_at: i64) {
        if let Some(task) = self.inner.tasks.lock().unwrap().get_mut(&id.as_str()) {
            task.updated_at = updated_at;
        }
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.inner.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_failure(&self, failure: Option<WriteFailure>) {
        *self.inner.write_failure.lock().unwrap() = failure;
    }

    pub fn set_gate(&self, gate: Option<Arc<Notify>>) {
        *self.inner.gate.lock().unwrap() = gate;
    }

    fn check_write(&self) -> RemoteResult<()> {
        match *self.inner.write_failure.lock().unwrap() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for FakeRemote {
    async fn get_task(&self, id: &TaskId) -> RemoteResult<Option<Task>> {
        let gate = self.inner.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.inner.fail_get.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("fake fetch failure".to_string()));
        }
        Ok(self.task(id))
    }

    async fn create_task(&self, draft: &TaskDraft) -> RemoteResult<Task> {
        self.check_write()?;
        let task = Task::from_draft(draft, TaskId::new(), self.tick());
        self.insert_task(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, changes: &TaskChanges) -> RemoteResult<()> {
        self.check_write()?;
        let now = self.tick();
        let mut tasks = self.inner.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&id.as_str())
            .ok_or_else(|| RemoteError::NotFound(format!("task {id}")))?;
        task.apply_changes(changes);
        task.updated_at = now;
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> RemoteResult<()> {
        self.check_write()?;
        let removed = self.inner.tasks.lock().unwrap().remove(&id.as_str());
        if removed.is_none() {
            return Err(RemoteError::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    async fn complete_task(&self, id: &TaskId, user_id: &UserId) -> RemoteResult<()> {
        self.check_write()?;
        let now = self.tick();
        let mut tasks = self.inner.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&id.as_str())
            .ok_or_else(|| RemoteError::NotFound(format!("task {id}")))?;
        task.status = TaskStatus::Done;
        task.assigned_to = Some(user_id.clone());
        task.completed_at = Some(now);
        task.updated_at = now;
        Ok(())
    }
}
