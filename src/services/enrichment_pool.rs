//! Enrichment Worker Pool for LinkShelf.
//!
//! Orchestrates a batch run: three-tier source selection, freshness policy,
//! concurrency-bounded dispatch over a shared cursor, persistence, and
//! progress reporting. No single-item failure can abort a batch — errors are
//! caught at the item boundary, recorded on the record, and counted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::managers::queue_manager::{QueueManager, QueueManagerTrait};
use crate::managers::record_store::{RecordStore, RecordStoreTrait};
use crate::services::categorizer;
use crate::services::metadata_fetcher::LinkProbeTrait;
use crate::services::metrics_cache::{ChangeType, MetricsCache};
use crate::services::platform_merger;
use crate::services::platform_parser;
use crate::types::batch::{
    BatchSummary, ItemResult, ItemStatus, ProgressCallback, ProgressEvent, ProgressStatus,
    SkipReason,
};
use crate::types::bookmark::{BookmarkRecord, Liveness};
use crate::types::config::EnrichmentConfig;
use crate::types::errors::{EnrichError, StoreError};

/// The enrichment pipeline's batch orchestrator.
///
/// Constructed once with explicit handles to its collaborators; holds no
/// global state, so tests can run isolated instances side by side.
pub struct EnrichmentPool {
    store: Arc<RecordStore>,
    queue: Arc<QueueManager>,
    fetcher: Arc<dyn LinkProbeTrait>,
    cache: Arc<MetricsCache>,
    config: EnrichmentConfig,
}

/// Shared state for one batch run.
///
/// `cursor` hands out indices; its atomic fetch-add is the only claim
/// operation, so no index is processed twice or skipped. The outcome
/// counters are atomics because workers run on a multithreaded runtime.
struct BatchContext {
    store: Arc<RecordStore>,
    fetcher: Arc<dyn LinkProbeTrait>,
    cache: Arc<MetricsCache>,
    force: bool,
    freshness_window: i64,
    rate_limit_ms: u64,
    items: Vec<BookmarkRecord>,
    cursor: AtomicUsize,
    completed: AtomicUsize,
    success: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    progress: Option<ProgressCallback>,
}

impl BatchContext {
    fn emit(&self, index: usize, record: &BookmarkRecord, status: ProgressStatus) {
        if let Some(callback) = &self.progress {
            callback(ProgressEvent {
                index,
                total: self.items.len(),
                completed: self.completed.load(Ordering::SeqCst),
                bookmark_id: record.id.clone(),
                url: record.url.clone(),
                title: record.title.clone(),
                status,
            });
        }
    }
}

impl EnrichmentPool {
    pub fn new(
        store: Arc<RecordStore>,
        queue: Arc<QueueManager>,
        fetcher: Arc<dyn LinkProbeTrait>,
        cache: Arc<MetricsCache>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            store,
            queue,
            fetcher,
            cache,
            config,
        }
    }

    /// Runs one enrichment batch.
    ///
    /// `batch_size` and `concurrency` default to the configured values.
    /// Only pre-batch setup failures (disabled pipeline, source selection)
    /// surface as errors; per-item failures are counted in the summary.
    /// A started batch always runs to completion.
    pub async fn run_batch(
        &self,
        batch_size: Option<usize>,
        progress: Option<ProgressCallback>,
        concurrency: Option<usize>,
        force: bool,
    ) -> Result<BatchSummary, EnrichError> {
        if !self.config.enrichment_enabled {
            return Err(EnrichError::Disabled);
        }

        let batch_size = batch_size.unwrap_or(self.config.batch_size);
        let concurrency = concurrency.unwrap_or(self.config.concurrency).max(1);

        let items = self.select_source(batch_size, force)?;
        let total = items.len();
        if total == 0 {
            info!(force, "enrichment batch: nothing to process");
            return Ok(BatchSummary::default());
        }
        info!(total, concurrency, force, "starting enrichment batch");

        let ctx = Arc::new(BatchContext {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            cache: Arc::clone(&self.cache),
            force,
            freshness_window: self.config.freshness_window_secs(),
            rate_limit_ms: self.config.rate_limit_ms,
            items,
            cursor: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            success: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            progress,
        });

        let workers = concurrency.min(total);
        let mut tasks = JoinSet::new();
        for worker_id in 0..workers {
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move { worker_loop(worker_id, ctx).await });
        }
        // The batch completes only once every worker has exhausted the cursor
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "enrichment worker task aborted");
            }
        }

        let success = ctx.success.load(Ordering::SeqCst);
        let failed = ctx.failed.load(Ordering::SeqCst);
        let skipped = ctx.skipped.load(Ordering::SeqCst);
        let summary = BatchSummary {
            processed: success + failed + skipped,
            success,
            failed,
            skipped,
        };
        info!(
            processed = summary.processed,
            success, failed, skipped, "enrichment batch finished"
        );
        Ok(summary)
    }

    /// Enriches a single bookmark outside of any batch.
    pub async fn enrich_one(&self, bookmark_id: &str, force: bool) -> Result<ItemResult, EnrichError> {
        if !self.config.enrichment_enabled {
            return Err(EnrichError::Disabled);
        }
        let record = self
            .store
            .get(bookmark_id)?
            .ok_or_else(|| EnrichError::Store(StoreError::NotFound(bookmark_id.to_string()).to_string()))?;

        let ctx = BatchContext {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            cache: Arc::clone(&self.cache),
            force,
            freshness_window: self.config.freshness_window_secs(),
            rate_limit_ms: 0,
            items: vec![record.clone()],
            cursor: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            success: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            progress: None,
        };
        Ok(process_item(&ctx, record).await)
    }

    /// Three-tier source selection, evaluated once per invocation.
    ///
    /// Force bypasses the queue entirely. Otherwise the queue is drained
    /// first; when it is empty, never-checked HTTP(S) bookmarks are selected
    /// directly — the queue is an acceleration structure, not the sole
    /// source of truth.
    fn select_source(&self, batch_size: usize, force: bool) -> Result<Vec<BookmarkRecord>, EnrichError> {
        if force {
            return Ok(self.store.select_for_forced(batch_size)?);
        }

        let queued = self.queue.next_batch(batch_size)?;
        if queued.is_empty() {
            return Ok(self.store.select_never_checked_http(batch_size)?);
        }

        let mut records = Vec::with_capacity(queued.len());
        for item in queued {
            // Entries are removed on dequeue regardless of outcome
            self.queue.dequeue(&item.queue_id)?;
            match self.store.get(&item.bookmark_id)? {
                Some(record) => records.push(record),
                None => debug!(bookmark_id = %item.bookmark_id, "dropping stale queue entry"),
            }
        }
        Ok(records)
    }
}

/// One logical worker: repeatedly claims the next index from the shared
/// cursor until it is exhausted. Claimed indices are processed in increasing
/// order within a worker; a short pause between claims keeps any single
/// remote host from being burst.
async fn worker_loop(worker_id: usize, ctx: Arc<BatchContext>) {
    loop {
        let index = ctx.cursor.fetch_add(1, Ordering::SeqCst);
        if index >= ctx.items.len() {
            break;
        }
        let record = ctx.items[index].clone();
        debug!(worker_id, index, url = %record.url, "worker claimed item");
        ctx.emit(index, &record, ProgressStatus::Processing);

        let result = process_item(&ctx, record.clone()).await;
        let status = match &result.status {
            ItemStatus::Success { dead_link: true } => {
                ctx.success.fetch_add(1, Ordering::SeqCst);
                ProgressStatus::Failed
            }
            ItemStatus::Success { dead_link: false } => {
                ctx.success.fetch_add(1, Ordering::SeqCst);
                ProgressStatus::Completed
            }
            ItemStatus::Skipped { .. } => {
                ctx.skipped.fetch_add(1, Ordering::SeqCst);
                ProgressStatus::Completed
            }
            ItemStatus::Failed { error } => {
                ctx.failed.fetch_add(1, Ordering::SeqCst);
                warn!(url = %record.url, error = %error, "enrichment item failed");
                ProgressStatus::Error
            }
        };
        ctx.completed.fetch_add(1, Ordering::SeqCst);
        ctx.emit(index, &record, status);

        if ctx.rate_limit_ms > 0 {
            sleep(Duration::from_millis(ctx.rate_limit_ms)).await;
        }
    }
}

/// Handles one bookmark. Every failure is converted to an outcome here; the
/// worker loop above never sees an error.
async fn process_item(ctx: &BatchContext, record: BookmarkRecord) -> ItemResult {
    let base = ItemResult {
        bookmark_id: record.id.clone(),
        url: record.url.clone(),
        status: ItemStatus::Skipped {
            reason: SkipReason::NonHttp,
        },
        category: None,
        platform: None,
    };

    if !record.is_http() {
        return base;
    }
    if !ctx.force && is_fresh(&record, ctx.freshness_window) {
        return ItemResult {
            status: ItemStatus::Skipped {
                reason: SkipReason::Fresh,
            },
            ..base
        };
    }

    match enrich_record(ctx, record.clone()).await {
        Ok((enriched, dead_link)) => ItemResult {
            status: ItemStatus::Success { dead_link },
            category: enriched.category.clone(),
            platform: enriched.platform.clone(),
            ..base
        },
        Err(error) => {
            // Advance last_checked even on failure, otherwise a permanently
            // broken URL would be reselected on every subsequent batch.
            let mut failed = record;
            failed.last_checked = Some(RecordStore::now());
            failed.enrichment_error = Some(error.clone());
            match ctx.store.upsert(&failed) {
                Ok(()) => ctx.cache.invalidate(ChangeType::Enrich),
                Err(e) => warn!(url = %failed.url, error = %e, "failed to persist failure state"),
            }
            ItemResult {
                status: ItemStatus::Failed { error },
                ..base
            }
        }
    }
}

fn is_fresh(record: &BookmarkRecord, window_secs: i64) -> bool {
    match record.last_checked {
        Some(checked) => RecordStore::now() - checked < window_secs,
        None => false,
    }
}

/// The probe → fetch → categorize → merge → persist chain for one record.
///
/// Returns the persisted record and whether the dead-link short circuit was
/// taken. Errors are stringly-typed; the caller records them on the record.
async fn enrich_record(
    ctx: &BatchContext,
    mut record: BookmarkRecord,
) -> Result<(BookmarkRecord, bool), String> {
    let liveness = ctx.fetcher.check_liveness(&record.url).await;
    record.is_alive = liveness;
    record.last_checked = Some(RecordStore::now());

    if liveness == Liveness::Dead {
        // Liveness-update-only path: no metadata fetch for a dead link
        record.enrichment_error = None;
        ctx.store.upsert(&record).map_err(|e| e.to_string())?;
        ctx.cache.invalidate(ChangeType::Enrich);
        return Ok((record, true));
    }

    let metadata = ctx.fetcher.fetch_metadata(&record.url).await;
    if !metadata.is_empty() {
        if metadata.description.is_some() {
            record.description = metadata.description.clone();
        }
        if !metadata.keywords.is_empty() {
            record.keywords = metadata.keywords.clone();
        }
        if metadata.favicon_url.is_some() {
            record.favicon_url = metadata.favicon_url.clone();
        }
        if metadata.content_snippet.is_some() {
            record.content_snippet = metadata.content_snippet.clone();
        }
        record.raw_metadata = serde_json::to_value(&metadata).ok();
    }

    if let Some(category) = categorizer::categorize(&record, &metadata) {
        record.category = Some(category);
    }

    let parsed = platform_parser::parse(&record.url);
    if let Some(merged) = platform_merger::merge(parsed, &metadata) {
        record.platform = Some(merged.kind.as_str().to_string());
        if merged.creator.is_some() {
            record.creator = merged.creator.clone();
        }
        if merged.content_type.is_some() {
            record.content_type = merged.content_type.clone();
        }
        record.platform_data = Some(merged);
    }

    record.enrichment_error = None;
    ctx.store.upsert(&record).map_err(|e| e.to_string())?;
    ctx.cache.invalidate(ChangeType::Enrich);
    Ok((record, false))
}
