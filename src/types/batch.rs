use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Why an item was counted as skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `last_checked` falls inside the freshness window.
    Fresh,
    /// The URL is not HTTP(S) and cannot be probed.
    NonHttp,
}

/// Per-item outcome of one enrichment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ItemStatus {
    /// Metadata fetched and merged, or a dead link recorded (liveness-only).
    Success { dead_link: bool },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl ItemStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemStatus::Success { .. })
    }
}

/// Result of enriching a single bookmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    pub bookmark_id: String,
    pub url: String,
    #[serde(flatten)]
    pub status: ItemStatus,
    pub category: Option<String>,
    pub platform: Option<String>,
}

/// Aggregated outcome of one batch run.
///
/// Invariant: `processed == success + failed + skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Stage reported for one item in the progress stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// The item was claimed by a worker.
    Processing,
    /// The item finished: enriched or skipped.
    Completed,
    /// The liveness probe classified the link as dead (short-circuit).
    Failed,
    /// An item-level processing error occurred.
    Error,
}

/// Progress event emitted after each step of a batch run.
///
/// Workers complete out of order relative to each other; consumers must not
/// assume `index` arrives monotonically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub index: usize,
    pub total: usize,
    /// Cumulative items finished across all workers, including this one.
    pub completed: usize,
    pub bookmark_id: String,
    pub url: String,
    pub title: String,
    pub status: ProgressStatus,
}

/// Callback invoked with each [`ProgressEvent`].
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
