//! Metrics Cache for LinkShelf.
//!
//! TTL-keyed store of derived aggregates. Entries are computed lazily on
//! read and deleted either by TTL expiry or by explicit invalidation when
//! the underlying dataset mutates. There is no proactive refresh.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Known metric keys. The invalidation mapping below is defined over these.
pub mod keys {
    pub const QUICK_STATS: &str = "quick_stats";
    pub const SUMMARY_STATS: &str = "summary_stats";
    pub const CATEGORY_STATS: &str = "category_stats";
    pub const EXPERTISE_STATS: &str = "expertise_stats";
    pub const DOMAIN_STATS: &str = "domain_stats";
    pub const PLATFORM_STATS: &str = "platform_stats";

    pub const ALL: &[&str] = &[
        QUICK_STATS,
        SUMMARY_STATS,
        CATEGORY_STATS,
        EXPERTISE_STATS,
        DOMAIN_STATS,
        PLATFORM_STATS,
    ];
}

/// Classification of a dataset mutation, for cache invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Add,
    Delete,
    Update,
    Enrich,
    All,
}

/// The fixed mutation-type → affected-key mapping.
///
/// Enrichment never changes which domains exist, so `Enrich` leaves the
/// domain distribution cached.
pub fn affected_keys(change: ChangeType) -> &'static [&'static str] {
    match change {
        ChangeType::Add | ChangeType::Delete | ChangeType::All => keys::ALL,
        ChangeType::Update => &[keys::QUICK_STATS, keys::SUMMARY_STATS, keys::DOMAIN_STATS],
        ChangeType::Enrich => &[
            keys::QUICK_STATS,
            keys::SUMMARY_STATS,
            keys::CATEGORY_STATS,
            keys::EXPERTISE_STATS,
            keys::PLATFORM_STATS,
        ],
    }
}

struct CachedMetric {
    data: Value,
    valid_until: Instant,
}

/// TTL cache of computed metrics.
///
/// Concurrent readers racing a miss may both invoke the compute function;
/// computes are pure aggregations over the record store, so the duplicate
/// work wastes cycles but cannot corrupt state. No single-flight lock.
pub struct MetricsCache {
    entries: Mutex<HashMap<String, CachedMetric>>,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedMetric>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached value for `key` when a live entry exists, otherwise
    /// invokes `compute`, stores the result with the given TTL, and returns it.
    ///
    /// An expired entry is never returned. A failed compute is not cached.
    pub fn get_or_compute<E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: impl FnOnce() -> Result<Value, E>,
    ) -> Result<Value, E> {
        let now = Instant::now();
        {
            let entries = self.lock();
            if let Some(entry) = entries.get(key) {
                if now < entry.valid_until {
                    return Ok(entry.data.clone());
                }
            }
        }

        // Compute outside the lock; a racing reader may duplicate this work.
        let data = compute()?;
        self.lock().insert(
            key.to_string(),
            CachedMetric {
                data: data.clone(),
                valid_until: now + ttl,
            },
        );
        Ok(data)
    }

    /// Deletes every key affected by the given change type.
    pub fn invalidate(&self, change: ChangeType) {
        let mut entries = self.lock();
        for key in affected_keys(change) {
            entries.remove(*key);
        }
    }

    /// Deletes a single key.
    pub fn invalidate_key(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Number of live (possibly expired, not yet reaped) entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new()
    }
}
