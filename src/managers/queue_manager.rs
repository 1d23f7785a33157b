//! Enrichment Queue for LinkShelf.
//!
//! Implements `QueueManagerTrait` — a durable, idempotent, priority-ordered
//! backlog of bookmark IDs awaiting enrichment, backed by SQLite via
//! `rusqlite`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::types::errors::QueueError;
use crate::types::queue::QueueItem;

/// Trait defining enrichment queue operations.
pub trait QueueManagerTrait {
    /// Adds a bookmark to the queue. Returns `false` (no-op) if an entry for
    /// that bookmark already exists.
    fn enqueue(&self, bookmark_id: &str, priority: i64) -> Result<bool, QueueError>;
    /// The next `n` items, priority descending, ties broken by insertion order.
    fn next_batch(&self, n: usize) -> Result<Vec<QueueItem>, QueueError>;
    /// Removes one entry by its queue ID.
    fn dequeue(&self, queue_id: &str) -> Result<(), QueueError>;
    fn size(&self) -> Result<usize, QueueError>;
}

/// Enrichment queue backed by a shared SQLite database.
pub struct QueueManager {
    db: Arc<Database>,
}

impl QueueManager {
    /// Creates a new `QueueManager` using the provided database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Reads a single queue row into a struct.
    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<QueueItem> {
        Ok(QueueItem {
            queue_id: row.get(0)?,
            bookmark_id: row.get(1)?,
            added_at: row.get(2)?,
            priority: row.get(3)?,
        })
    }
}

impl QueueManagerTrait for QueueManager {
    fn enqueue(&self, bookmark_id: &str, priority: i64) -> Result<bool, QueueError> {
        let queue_id = Uuid::new_v4().to_string();
        let now = Self::now();

        // UNIQUE(bookmark_id) + OR IGNORE makes the operation idempotent:
        // a second enqueue for the same bookmark changes nothing.
        let affected = self
            .db
            .connection()
            .execute(
                "INSERT OR IGNORE INTO enrichment_queue (queue_id, bookmark_id, added_at, priority) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![queue_id, bookmark_id, now, priority],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(affected > 0)
    }

    fn next_batch(&self, n: usize) -> Result<Vec<QueueItem>, QueueError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT queue_id, bookmark_id, added_at, priority FROM enrichment_queue \
                 ORDER BY priority DESC, added_at ASC, rowid ASC LIMIT ?1",
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![n as i64], Self::row_to_item)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| QueueError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    fn dequeue(&self, queue_id: &str) -> Result<(), QueueError> {
        let affected = self
            .db
            .connection()
            .execute(
                "DELETE FROM enrichment_queue WHERE queue_id = ?1",
                params![queue_id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if affected == 0 {
            return Err(QueueError::NotFound(queue_id.to_string()));
        }
        Ok(())
    }

    fn size(&self) -> Result<usize, QueueError> {
        let count: i64 = self
            .db
            .connection()
            .query_row("SELECT COUNT(*) FROM enrichment_queue", [], |row| row.get(0))
            .map_err(|e| QueueError::Database(e.to_string()))?;
        Ok(count as usize)
    }
}
