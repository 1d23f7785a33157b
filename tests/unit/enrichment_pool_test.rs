//! Unit tests for the enrichment worker pool.
//!
//! The network seam is replaced with a scripted probe so batch behavior —
//! source selection, freshness policy, outcome classification, concurrency —
//! is exercised without any real I/O.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use linkshelf::app::App;
use linkshelf::database::Database;
use linkshelf::managers::queue_manager::QueueManagerTrait;
use linkshelf::managers::record_store::{RecordStore, RecordStoreTrait};
use linkshelf::services::metadata_fetcher::LinkProbeTrait;
use linkshelf::types::batch::{ProgressCallback, ProgressEvent, ProgressStatus};
use linkshelf::types::bookmark::Liveness;
use linkshelf::types::config::EnrichmentConfig;
use linkshelf::types::errors::EnrichError;
use linkshelf::types::metadata::PageMetadata;

/// Scripted stand-in for the real fetcher.
struct MockProbe {
    liveness: Liveness,
    metadata: PageMetadata,
    liveness_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockProbe {
    fn new(liveness: Liveness, metadata: PageMetadata) -> Self {
        Self {
            liveness,
            metadata,
            liveness_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    fn alive_with_description(description: &str) -> Self {
        let metadata = PageMetadata {
            description: Some(description.to_string()),
            ..PageMetadata::default()
        };
        Self::new(Liveness::Alive, metadata)
    }
}

#[async_trait]
impl LinkProbeTrait for MockProbe {
    async fn check_liveness(&self, _url: &str) -> Liveness {
        self.liveness_calls.fetch_add(1, Ordering::SeqCst);
        self.liveness
    }

    async fn fetch_metadata(&self, _url: &str) -> PageMetadata {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata.clone()
    }
}

fn test_config() -> EnrichmentConfig {
    EnrichmentConfig {
        rate_limit_ms: 0,
        ..EnrichmentConfig::default()
    }
}

fn build_app(probe: Arc<MockProbe>, config: EnrichmentConfig) -> App {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    App::wire(db, probe, config).expect("Failed to wire app")
}

fn collecting_callback() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback: ProgressCallback = Arc::new(move |event| {
        sink.lock().unwrap().push(event);
    });
    (callback, events)
}

/// A queued unchecked bookmark enriched against a live page ends up with the
/// fetched description, a liveness verdict, and an advanced check time.
#[tokio::test]
async fn test_single_item_success() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://example.com/a", "Example A").unwrap();
    assert!(app.enqueue(&id, 0).unwrap());

    let summary = app.pool.run_batch(Some(1), None, Some(1), false).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 0);

    let record = app.store.get(&id).unwrap().unwrap();
    assert_eq!(record.description.as_deref(), Some("X"));
    assert!(record.last_checked.is_some());
    assert_eq!(record.is_alive, Liveness::Alive);
    assert_eq!(record.enrichment_error, None);
}

/// A dead link short-circuits: liveness is recorded, the metadata fetch is
/// never invoked, and the item still counts as success.
#[tokio::test]
async fn test_dead_link_short_circuits_fetch() {
    let probe = Arc::new(MockProbe::new(Liveness::Dead, PageMetadata::default()));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://gone.example.com", "Gone").unwrap();
    app.enqueue(&id, 0).unwrap();

    let summary = app.pool.run_batch(Some(1), None, Some(1), false).await.unwrap();
    assert_eq!(summary.success, 1, "liveness-update-only path counts as success");
    assert_eq!(summary.failed, 0);

    assert_eq!(probe.liveness_calls.load(Ordering::SeqCst), 1);
    assert_eq!(probe.fetch_calls.load(Ordering::SeqCst), 0, "fetch must be skipped");

    let record = app.store.get(&id).unwrap().unwrap();
    assert_eq!(record.is_alive, Liveness::Dead);
    assert!(record.last_checked.is_some());
}

/// Unknown liveness does not short-circuit; only dead does.
#[tokio::test]
async fn test_unknown_liveness_still_fetches() {
    let probe = Arc::new(MockProbe::new(Liveness::Unknown, PageMetadata::default()));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://opaque.example.com", "Opaque").unwrap();
    app.enqueue(&id, 0).unwrap();

    app.pool.run_batch(Some(1), None, Some(1), false).await.unwrap();
    assert_eq!(probe.fetch_calls.load(Ordering::SeqCst), 1);

    let record = app.store.get(&id).unwrap().unwrap();
    assert_eq!(record.is_alive, Liveness::Unknown);
}

/// A bookmark inside the freshness window is skipped without any network
/// call, but its queue entry is still consumed.
#[tokio::test]
async fn test_fresh_item_skipped_without_network() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://fresh.example.com", "Fresh").unwrap();
    let mut record = app.store.get(&id).unwrap().unwrap();
    record.last_checked = Some(RecordStore::now());
    app.store.upsert(&record).unwrap();
    app.enqueue(&id, 0).unwrap();

    let summary = app.pool.run_batch(Some(10), None, Some(1), false).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.success, 0);
    assert_eq!(probe.liveness_calls.load(Ordering::SeqCst), 0, "no network call");
    assert_eq!(app.queue.size().unwrap(), 0, "queue entry consumed anyway");
}

/// Force mode re-enriches even fresh items.
#[tokio::test]
async fn test_force_overrides_freshness() {
    let probe = Arc::new(MockProbe::alive_with_description("refreshed"));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://fresh.example.com", "Fresh").unwrap();
    let mut record = app.store.get(&id).unwrap().unwrap();
    record.last_checked = Some(RecordStore::now());
    app.store.upsert(&record).unwrap();

    let summary = app.pool.run_batch(Some(10), None, Some(1), true).await.unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(probe.liveness_calls.load(Ordering::SeqCst), 1);
}

/// Non-HTTP(S) URLs are counted as skipped, never probed.
#[tokio::test]
async fn test_non_http_url_skipped() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    app.add_bookmark("file:///etc/hosts", "Local file").unwrap();

    // Forced selection is unfiltered, so the non-HTTP record is selected
    let summary = app.pool.run_batch(Some(10), None, Some(1), true).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(probe.liveness_calls.load(Ordering::SeqCst), 0);
}

/// With an empty queue, never-checked HTTP bookmarks are selected directly.
#[tokio::test]
async fn test_queue_empty_falls_back_to_direct_selection() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://example.com", "Example").unwrap();
    assert_eq!(app.queue.size().unwrap(), 0);

    let summary = app.pool.run_batch(Some(10), None, Some(1), false).await.unwrap();
    assert_eq!(summary.success, 1);
    assert!(app.store.get(&id).unwrap().unwrap().last_checked.is_some());
}

/// Higher-priority queue entries are claimed first (single worker).
#[tokio::test]
async fn test_queue_priority_order_drives_processing_order() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let low = app.add_bookmark("https://low.example.com", "Low").unwrap();
    let high = app.add_bookmark("https://high.example.com", "High").unwrap();
    app.enqueue(&low, 1).unwrap();
    app.enqueue(&high, 10).unwrap();

    let (callback, events) = collecting_callback();
    app.pool.run_batch(Some(10), Some(callback), Some(1), false).await.unwrap();

    let processing_order: Vec<String> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.status == ProgressStatus::Processing)
        .map(|e| e.bookmark_id.clone())
        .collect();
    assert_eq!(processing_order, vec![high, low]);
    assert_eq!(app.queue.size().unwrap(), 0);
}

/// Conservation and exactly-once dispatch: a 50-item batch at concurrency 10
/// processes every bookmark exactly once.
#[tokio::test]
async fn test_concurrent_batch_processes_each_item_exactly_once() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let mut ids = Vec::new();
    for i in 0..50 {
        let id = app
            .add_bookmark(&format!("https://site{}.example.com", i), &format!("Site {}", i))
            .unwrap();
        app.enqueue(&id, 0).unwrap();
        ids.push(id);
    }

    let (callback, events) = collecting_callback();
    let summary = app
        .pool
        .run_batch(Some(50), Some(callback), Some(10), false)
        .await
        .unwrap();

    assert_eq!(summary.processed, 50);
    assert_eq!(summary.success + summary.failed + summary.skipped, summary.processed);
    assert_eq!(summary.success, 50);

    let events = events.lock().unwrap();
    let mut finished: Vec<String> = events
        .iter()
        .filter(|e| e.status != ProgressStatus::Processing)
        .map(|e| e.bookmark_id.clone())
        .collect();
    assert_eq!(finished.len(), 50, "one completion event per item");
    finished.sort();
    finished.dedup();
    assert_eq!(finished.len(), 50, "no bookmark appears twice");
    assert_eq!(probe.liveness_calls.load(Ordering::SeqCst), 50);
}

/// After an item-level processing error, last_checked is still advanced, so
/// an immediate second non-forced run does not reselect the same bookmark.
#[tokio::test]
async fn test_failed_item_is_not_retried_next_batch() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://example.com", "Example").unwrap();

    // Inject a persistence failure on the success path only: the enriched
    // write carries no enrichment_error, the failure-path write does.
    app.db
        .connection()
        .execute_batch(
            "CREATE TRIGGER inject_failure BEFORE INSERT ON bookmarks
             WHEN NEW.enrichment_error IS NULL AND NEW.last_checked IS NOT NULL
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        )
        .unwrap();

    let summary = app.pool.run_batch(Some(10), None, Some(1), false).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.success, 0);

    let record = app.store.get(&id).unwrap().unwrap();
    assert!(record.last_checked.is_some(), "failure must advance last_checked");
    assert!(record.enrichment_error.is_some());

    // The broken bookmark must not be reselected immediately
    let second = app.pool.run_batch(Some(10), None, Some(1), false).await.unwrap();
    assert_eq!(second.processed, 0, "no retry storm on a broken record");
}

#[tokio::test]
async fn test_enrich_one_success() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://example.com", "Example").unwrap();
    let result = app.pool.enrich_one(&id, false).await.unwrap();
    assert!(result.status.is_success());

    let record = app.store.get(&id).unwrap().unwrap();
    assert_eq!(record.description.as_deref(), Some("X"));
}

#[tokio::test]
async fn test_enrich_one_unknown_id_is_an_error() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(probe, test_config());

    assert!(app.pool.enrich_one("no-such-id", false).await.is_err());
}

#[tokio::test]
async fn test_disabled_pipeline_refuses_to_run() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let config = EnrichmentConfig {
        enrichment_enabled: false,
        ..test_config()
    };
    let app = build_app(probe, config);

    let result = app.pool.run_batch(Some(1), None, Some(1), false).await;
    assert!(matches!(result, Err(EnrichError::Disabled)));
}

/// Enrichment invalidates quick stats but leaves the domain distribution.
#[tokio::test]
async fn test_enrichment_invalidates_cache_scoped() {
    let probe = Arc::new(MockProbe::alive_with_description("X"));
    let app = build_app(Arc::clone(&probe), test_config());

    let id = app.add_bookmark("https://example.com", "Example").unwrap();
    app.enqueue(&id, 0).unwrap();

    // Warm both metrics
    let quick_before = app.stats.quick_stats().unwrap();
    app.stats.domain_stats().unwrap();
    assert_eq!(app.cache.len(), 2);

    app.pool.run_batch(Some(1), None, Some(1), false).await.unwrap();

    // Quick stats was dropped by the enrich invalidation; the domain
    // distribution entry survived.
    assert_eq!(app.cache.len(), 1);

    let quick_after = app.stats.quick_stats().unwrap();
    assert_ne!(
        quick_before["checked"], quick_after["checked"],
        "quick stats recomputed after enrichment"
    );
}
