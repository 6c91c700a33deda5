//! Pending action queue
//!
//! Durable FIFO log of mutations awaiting remote confirmation. Nothing leaves
//! the queue except by explicit dequeue; a persistence failure on enqueue
//! propagates to the caller, since a silently lost action is a lost user
//! mutation.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{ActionId, ActionPayload, PendingAction, DEFAULT_MAX_RETRIES};

/// Trait for pending action storage operations
pub trait ActionQueue {
    /// Validate and append an action, returning the durable record
    fn enqueue(&self, payload: ActionPayload) -> Result<PendingAction>;

    /// Remove an action; unknown ids are a no-op, and retrying is idempotent
    fn dequeue(&self, id: &ActionId) -> Result<()>;

    /// All queued actions in enqueue order
    fn list(&self) -> Result<Vec<PendingAction>>;

    /// Bump an action's retry count after a failed attempt
    fn increment_retry(&self, id: &ActionId) -> Result<()>;

    /// Number of queued actions
    fn count(&self) -> Result<usize>;
}

/// `SQLite` implementation of `ActionQueue`
pub struct SqliteActionQueue<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteActionQueue<'a> {
    /// Create a queue over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(ActionId, String, i64, u32, u32)> {
        let id: String = row.get(0)?;
        let id = id.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "id".to_string(), rusqlite::types::Type::Text)
        })?;
        Ok((id, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }
}

impl ActionQueue for SqliteActionQueue<'_> {
    fn enqueue(&self, payload: ActionPayload) -> Result<PendingAction> {
        payload.validate()?;

        let action = PendingAction {
            id: ActionId::new(),
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        };

        let payload_json = serde_json::to_string(&action.payload)?;
        self.conn.execute(
            "INSERT INTO pending_actions (id, payload, timestamp, retry_count, max_retries)
             VALUES (?, ?, ?, ?, ?)",
            params![
                action.id.as_str(),
                payload_json,
                action.timestamp,
                action.retry_count,
                action.max_retries
            ],
        )?;

        tracing::debug!(
            "Queued {} action {} for later sync",
            action.payload.kind(),
            action.id
        );
        Ok(action)
    }

    fn dequeue(&self, id: &ActionId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM pending_actions WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<PendingAction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload, timestamp, retry_count, max_retries
             FROM pending_actions
             ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map([], Self::parse_row)?;

        let mut actions = Vec::new();
        for row in rows {
            let (id, payload_json, timestamp, retry_count, max_retries) = row?;
            match serde_json::from_str(&payload_json) {
                Ok(payload) => actions.push(PendingAction {
                    id,
                    payload,
                    timestamp,
                    retry_count,
                    max_retries,
                }),
                Err(error) => {
                    // One corrupt payload must not hide the rest of the queue.
                    tracing::warn!("Skipping unparseable pending action {id}: {error}");
                }
            }
        }
        Ok(actions)
    }

    fn increment_retry(&self, id: &ActionId) -> Result<()> {
        self.conn.execute(
            "UPDATE pending_actions SET retry_count = retry_count + 1 WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM pending_actions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskChanges, TaskId};
    use crate::store::Store;
    use pretty_assertions::assert_eq;

    fn update_payload(title: &str) -> ActionPayload {
        ActionPayload::Update {
            task_id: TaskId::new(),
            changes: TaskChanges {
                title: Some(title.to_string()),
                ..TaskChanges::default()
            },
        }
    }

    #[test]
    fn test_enqueue_list_preserves_fifo_order() {
        let store = Store::open_in_memory().unwrap();
        let queue = SqliteActionQueue::new(store.connection());

        let first = queue.enqueue(update_payload("first")).unwrap();
        let second = queue.enqueue(update_payload("second")).unwrap();
        let third = queue.enqueue(update_payload("third")).unwrap();

        let ids: Vec<ActionId> = queue.list().unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[test]
    fn test_enqueue_rejects_invalid_payload() {
        let store = Store::open_in_memory().unwrap();
        let queue = SqliteActionQueue::new(store.connection());

        let invalid = ActionPayload::Update {
            task_id: TaskId::new(),
            changes: TaskChanges::default(),
        };
        assert!(queue.enqueue(invalid).is_err());
        assert_eq!(queue.count().unwrap(), 0);
    }

    #[test]
    fn test_dequeue_unknown_id_is_noop() {
        let store = Store::open_in_memory().unwrap();
        let queue = SqliteActionQueue::new(store.connection());

        queue.enqueue(update_payload("kept")).unwrap();
        queue.dequeue(&ActionId::new()).unwrap();
        assert_eq!(queue.count().unwrap(), 1);
    }

    #[test]
    fn test_dequeue_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let queue = SqliteActionQueue::new(store.connection());

        let action = queue.enqueue(update_payload("gone")).unwrap();
        queue.dequeue(&action.id).unwrap();
        queue.dequeue(&action.id).unwrap();
        assert_eq!(queue.count().unwrap(), 0);
    }

    #[test]
    fn test_increment_retry() {
        let store = Store::open_in_memory().unwrap();
        let queue = SqliteActionQueue::new(store.connection());

        let action = queue.enqueue(update_payload("retry me")).unwrap();
        queue.increment_retry(&action.id).unwrap();
        queue.increment_retry(&action.id).unwrap();

        let listed = queue.list().unwrap();
        assert_eq!(listed[0].retry_count, 2);
        assert!(listed[0].is_last_attempt());
    }

    #[test]
    fn test_corrupt_row_is_skipped_not_fatal() {
        let store = Store::open_in_memory().unwrap();
        let queue = SqliteActionQueue::new(store.connection());

        queue.enqueue(update_payload("good")).unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO pending_actions (id, payload, timestamp, retry_count, max_retries)
                 VALUES (?, 'garbage{', 0, 0, 3)",
                params![ActionId::new().as_str()],
            )
            .unwrap();

        let listed = queue.list().unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn test_queue_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tandem.db");

        let action = {
            let store = Store::open(&path).unwrap();
            let queue = SqliteActionQueue::new(store.connection());
            queue.enqueue(update_payload("durable")).unwrap()
        };

        let store = Store::open(&path).unwrap();
        let queue = SqliteActionQueue::new(store.connection());
        let listed = queue.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, action.id);
        assert_eq!(listed[0].payload, action.payload);
    }
}
