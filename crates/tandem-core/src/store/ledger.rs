//! Optimistic update ledger
//!
//! Stores the pre-mutation snapshot of a task so a failed optimistic change
//! can be rolled back exactly. At most one entry lives per task: a second
//! tentative edit before the first resolves keeps the earliest original
//! snapshot, so rollback always restores the last confirmed state rather
//! than an unconfirmed intermediate one.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{OptimisticUpdate, Task, TaskId, UpdateId};

/// Trait for optimistic update storage operations
pub trait UpdateLedger {
    /// Record a tentative mutation, returning the live entry's id.
    ///
    /// Upserts per task: an existing entry keeps its id and original
    /// snapshot; only the optimistic side and label advance.
    fn record(
        &self,
        task_id: &TaskId,
        original: Option<&Task>,
        optimistic: Option<&Task>,
        action: &str,
    ) -> Result<UpdateId>;

    /// Drop an entry after remote confirmation (success path)
    fn discard(&self, id: &UpdateId) -> Result<()>;

    /// Drop the entry for a task after remote confirmation
    fn discard_for_task(&self, task_id: &TaskId) -> Result<()>;

    /// Atomically read and remove an entry (failure path).
    ///
    /// `None` means "nothing to roll back", not an error.
    fn rollback(&self, id: &UpdateId) -> Result<Option<OptimisticUpdate>>;

    /// Atomically read and remove the entry for a task
    fn rollback_for_task(&self, task_id: &TaskId) -> Result<Option<OptimisticUpdate>>;

    /// Number of live entries
    fn count(&self) -> Result<usize>;

    /// Remove entries older than `max_age_ms`, sparing tasks in `keep_tasks`
    /// (tasks whose pending action is still queued must stay recoverable).
    fn cleanup(&self, max_age_ms: i64, keep_tasks: &[TaskId]) -> Result<usize>;
}

/// `SQLite` implementation of `UpdateLedger`
pub struct SqliteUpdateLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteUpdateLedger<'a> {
    /// Create a ledger over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, TaskId, Option<String>, Option<String>, i64, String)> {
        let task_id: String = row.get(1)?;
        let task_id = task_id.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                1,
                "task_id".to_string(),
                rusqlite::types::Type::Text,
            )
        })?;
        Ok((
            row.get(0)?,
            task_id,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn take_where(&self, column: &str, value: &str) -> Result<Option<OptimisticUpdate>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, task_id, original_task, optimistic_task, timestamp, action
                     FROM optimistic_updates WHERE {column} = ?"
                ),
                params![value],
                Self::parse_entry,
            )
            .optional()?;

        let Some((id, task_id, original_json, optimistic_json, timestamp, action)) = row else {
            return Ok(None);
        };

        self.conn.execute(
            "DELETE FROM optimistic_updates WHERE id = ?",
            params![id],
        )?;

        let parse_task = |json: Option<String>| -> Result<Option<Task>> {
            Ok(match json {
                Some(json) => Some(serde_json::from_str(&json)?),
                None => None,
            })
        };

        Ok(Some(OptimisticUpdate {
            id: id
                .parse()
                .map_err(|_| crate::Error::InvalidInput("invalid ledger entry id".to_string()))?,
            task_id,
            original_task: parse_task(original_json)?,
            optimistic_task: parse_task(optimistic_json)?,
            timestamp,
            action,
        }))
    }
}

impl UpdateLedger for SqliteUpdateLedger<'_> {
    fn record(
        &self,
        task_id: &TaskId,
        original: Option<&Task>,
        optimistic: Option<&Task>,
        action: &str,
    ) -> Result<UpdateId> {
        let id = UpdateId::new();
        let original_json = original.map(serde_json::to_string).transpose()?;
        let optimistic_json = optimistic.map(serde_json::to_string).transpose()?;
        let now = chrono::Utc::now().timestamp_millis();

        self.conn.execute(
            "INSERT INTO optimistic_updates (id, task_id, original_task, optimistic_task, timestamp, action)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(task_id) DO UPDATE SET
                 optimistic_task = excluded.optimistic_task,
                 timestamp = excluded.timestamp,
                 action = excluded.action",
            params![
                id.as_str(),
                task_id.as_str(),
                original_json,
                optimistic_json,
                now,
                action
            ],
        )?;

        // The upsert keeps the existing row's id; report the live one.
        let live_id: String = self.conn.query_row(
            "SELECT id FROM optimistic_updates WHERE task_id = ?",
            params![task_id.as_str()],
            |row| row.get(0),
        )?;
        live_id
            .parse()
            .map_err(|_| crate::Error::InvalidInput("invalid ledger entry id".to_string()))
    }

    fn discard(&self, id: &UpdateId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM optimistic_updates WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn discard_for_task(&self, task_id: &TaskId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM optimistic_updates WHERE task_id = ?",
            params![task_id.as_str()],
        )?;
        Ok(())
    }

    fn rollback(&self, id: &UpdateId) -> Result<Option<OptimisticUpdate>> {
        self.take_where("id", &id.as_str())
    }

    fn rollback_for_task(&self, task_id: &TaskId) -> Result<Option<OptimisticUpdate>> {
        self.take_where("task_id", &task_id.as_str())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM optimistic_updates",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn cleanup(&self, max_age_ms: i64, keep_tasks: &[TaskId]) -> Result<usize> {
        let cutoff = chrono::Utc::now().timestamp_millis() - max_age_ms;

        let mut stmt = self
            .conn
            .prepare("SELECT id, task_id FROM optimistic_updates WHERE timestamp < ?")?;
        let rows = stmt.query_map(params![cutoff], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut removed = 0;
        for row in rows {
            let (id, task_id) = row?;
            if keep_tasks.iter().any(|keep| keep.as_str() == task_id) {
                continue;
            }
            removed += self
                .conn
                .execute("DELETE FROM optimistic_updates WHERE id = ?", params![id])?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PartnershipId, TaskDraft, UserId};
    use crate::store::Store;
    use pretty_assertions::assert_eq;

    fn task(title: &str) -> Task {
        let draft = TaskDraft {
            title: title.to_string(),
            description: String::new(),
            category: String::new(),
            due_date: None,
            created_by: UserId::new("alice"),
            partnership_id: PartnershipId::new("pair-1"),
        };
        Task::from_draft(&draft, TaskId::new(), 1000)
    }

    #[test]
    fn test_rollback_returns_exact_snapshot_then_none() {
        let store = Store::open_in_memory().unwrap();
        let ledger = SqliteUpdateLedger::new(store.connection());

        let original = task("original");
        let mut optimistic = original.clone();
        optimistic.title = "edited".to_string();

        let id = ledger
            .record(&original.id, Some(&original), Some(&optimistic), "update")
            .unwrap();

        let rolled = ledger.rollback(&id).unwrap().unwrap();
        assert_eq!(rolled.original_task, Some(original));
        assert_eq!(rolled.action, "update");

        assert!(ledger.rollback(&id).unwrap().is_none());
    }

    #[test]
    fn test_discard_then_rollback_is_none() {
        let store = Store::open_in_memory().unwrap();
        let ledger = SqliteUpdateLedger::new(store.connection());

        let original = task("t");
        let id = ledger
            .record(&original.id, Some(&original), Some(&original), "claim")
            .unwrap();
        ledger.discard(&id).unwrap();
        assert!(ledger.rollback(&id).unwrap().is_none());
    }

    #[test]
    fn test_second_edit_keeps_earliest_original() {
        let store = Store::open_in_memory().unwrap();
        let ledger = SqliteUpdateLedger::new(store.connection());

        let original = task("v1");
        let mut first_edit = original.clone();
        first_edit.title = "v2".to_string();
        let mut second_edit = first_edit.clone();
        second_edit.title = "v3".to_string();

        let first_id = ledger
            .record(&original.id, Some(&original), Some(&first_edit), "update")
            .unwrap();
        let second_id = ledger
            .record(
                &original.id,
                Some(&first_edit),
                Some(&second_edit),
                "update",
            )
            .unwrap();

        // Same live entry, original preserved from before the first edit.
        assert_eq!(first_id, second_id);
        assert_eq!(ledger.count().unwrap(), 1);

        let rolled = ledger.rollback_for_task(&original.id).unwrap().unwrap();
        assert_eq!(rolled.original_task, Some(original));
        assert_eq!(rolled.optimistic_task, Some(second_edit));
    }

    #[test]
    fn test_create_entry_has_no_original() {
        let store = Store::open_in_memory().unwrap();
        let ledger = SqliteUpdateLedger::new(store.connection());

        let optimistic = task("new");
        ledger
            .record(&optimistic.id, None, Some(&optimistic), "create")
            .unwrap();

        let rolled = ledger.rollback_for_task(&optimistic.id).unwrap().unwrap();
        assert_eq!(rolled.original_task, None);
        assert_eq!(rolled.optimistic_task, Some(optimistic));
    }

    #[test]
    fn test_cleanup_spares_recent_and_queued_tasks() {
        let store = Store::open_in_memory().unwrap();
        let ledger = SqliteUpdateLedger::new(store.connection());

        let stale = task("stale");
        let queued = task("queued");
        let fresh = task("fresh");
        ledger
            .record(&stale.id, Some(&stale), Some(&stale), "update")
            .unwrap();
        ledger
            .record(&queued.id, Some(&queued), Some(&queued), "update")
            .unwrap();
        ledger
            .record(&fresh.id, Some(&fresh), Some(&fresh), "update")
            .unwrap();

        // Age the first two entries past the cutoff.
        let old = chrono::Utc::now().timestamp_millis() - 7_200_000;
        for aged in [&stale, &queued] {
            store
                .connection()
                .execute(
                    "UPDATE optimistic_updates SET timestamp = ? WHERE task_id = ?",
                    params![old, aged.id.as_str()],
                )
                .unwrap();
        }

        let removed = ledger.cleanup(3_600_000, &[queued.id]).unwrap();
        assert_eq!(removed, 1);
        assert!(ledger.rollback_for_task(&queued.id).unwrap().is_some());
        assert!(ledger.rollback_for_task(&fresh.id).unwrap().is_some());
        assert!(ledger.rollback_for_task(&stale.id).unwrap().is_none());
    }
}
