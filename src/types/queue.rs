use serde::{Deserialize, Serialize};

/// A pending enrichment task for one bookmark.
///
/// At most one live entry exists per `bookmark_id`; the queue enforces this
/// with a UNIQUE constraint, making enqueue idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub queue_id: String,
    pub bookmark_id: String,
    pub added_at: i64,
    pub priority: i64,
}
