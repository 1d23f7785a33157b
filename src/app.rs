//! App Core for LinkShelf.
//!
//! Central struct wiring the database, record store, queue, metrics cache,
//! and enrichment pool into one explicit handle. Tests construct isolated
//! instances over in-memory databases; nothing here is global.

use std::sync::Arc;

use uuid::Uuid;

use crate::database::Database;
use crate::managers::queue_manager::{QueueManager, QueueManagerTrait};
use crate::managers::record_store::{RecordStore, RecordStoreTrait};
use crate::services::enrichment_pool::EnrichmentPool;
use crate::services::metadata_fetcher::{LinkProbeTrait, MetadataFetcher};
use crate::services::metrics_cache::{ChangeType, MetricsCache};
use crate::services::stats_service::StatsService;
use crate::types::bookmark::BookmarkRecord;
use crate::types::config::EnrichmentConfig;
use crate::types::errors::{EnrichError, QueueError, StoreError};

/// Central application handle.
///
/// Mutation entry points live here so every record mutation fires the
/// matching metrics-cache invalidation.
pub struct App {
    pub db: Arc<Database>,
    pub store: Arc<RecordStore>,
    pub queue: Arc<QueueManager>,
    pub cache: Arc<MetricsCache>,
    pub stats: StatsService,
    pub pool: EnrichmentPool,
}

impl App {
    /// Opens the database at `db_path` and wires all components.
    pub fn new(db_path: &str, config: EnrichmentConfig) -> Result<Self, EnrichError> {
        let db = Database::open(db_path)
            .map_err(|e| EnrichError::Setup(format!("Database init failed: {}", e)))?;
        let fetcher = MetadataFetcher::new()?;
        Self::wire(db, Arc::new(fetcher), config)
    }

    /// In-memory variant for tests.
    pub fn open_in_memory(config: EnrichmentConfig) -> Result<Self, EnrichError> {
        let db = Database::open_in_memory()
            .map_err(|e| EnrichError::Setup(format!("Database init failed: {}", e)))?;
        let fetcher = MetadataFetcher::new()?;
        Self::wire(db, Arc::new(fetcher), config)
    }

    /// Wires components around an open database and a probe implementation.
    ///
    /// The probe seam is explicit so tests can substitute a scripted fetcher.
    pub fn wire(
        db: Database,
        fetcher: Arc<dyn LinkProbeTrait>,
        config: EnrichmentConfig,
    ) -> Result<Self, EnrichError> {
        let db = Arc::new(db);
        let store = Arc::new(RecordStore::new(Arc::clone(&db)));
        let queue = Arc::new(QueueManager::new(Arc::clone(&db)));
        let cache = Arc::new(MetricsCache::new());
        let stats = StatsService::new(Arc::clone(&store), Arc::clone(&cache));
        let pool = EnrichmentPool::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            fetcher,
            Arc::clone(&cache),
            config,
        );

        Ok(Self {
            db,
            store,
            queue,
            cache,
            stats,
            pool,
        })
    }

    /// Ingests a new bookmark with all enrichment fields unset.
    /// Returns the generated record ID.
    pub fn add_bookmark(&self, url: &str, title: &str) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let record = BookmarkRecord::new(&id, url, title, RecordStore::now());
        self.store.insert(&record)?;
        self.cache.invalidate(ChangeType::Add);
        Ok(id)
    }

    /// Deletes a bookmark; its queue entry goes with it.
    pub fn remove_bookmark(&self, id: &str) -> Result<(), StoreError> {
        self.store.remove(id)?;
        self.cache.invalidate(ChangeType::Delete);
        Ok(())
    }

    /// Updates url and/or title of an existing bookmark.
    pub fn update_bookmark(
        &self,
        id: &str,
        url: Option<&str>,
        title: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut record = self
            .store
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(url) = url {
            record.url = url.to_string();
            record.domain = crate::types::bookmark::domain_of(url);
        }
        if let Some(title) = title {
            record.title = title.to_string();
        }
        self.store.upsert(&record)?;
        self.cache.invalidate(ChangeType::Update);
        Ok(())
    }

    /// Queues a bookmark for enrichment. Idempotent.
    pub fn enqueue(&self, bookmark_id: &str, priority: i64) -> Result<bool, QueueError> {
        self.queue.enqueue(bookmark_id, priority)
    }
}
