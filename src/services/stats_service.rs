//! Stats Service for LinkShelf.
//!
//! Derived aggregate statistics over the record set, read through the
//! metrics cache so repeated dashboard-style reads stay cheap. Every
//! computation is a pure read-only aggregation; staleness is bounded by
//! each metric's TTL plus mutation-driven invalidation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::managers::record_store::{RecordStore, RecordStoreTrait};
use crate::services::metrics_cache::{keys, MetricsCache};
use crate::types::errors::StoreError;

const QUICK_TTL: Duration = Duration::from_secs(5 * 60);
const SUMMARY_TTL: Duration = Duration::from_secs(10 * 60);
const CATEGORY_TTL: Duration = Duration::from_secs(10 * 60);
const EXPERTISE_TTL: Duration = Duration::from_secs(30 * 60);
const DOMAIN_TTL: Duration = Duration::from_secs(30 * 60);
const PLATFORM_TTL: Duration = Duration::from_secs(30 * 60);

const EXPERTISE_TOP_N: usize = 10;

/// Aggregate statistics reader.
pub struct StatsService {
    store: Arc<RecordStore>,
    cache: Arc<MetricsCache>,
}

impl StatsService {
    pub fn new(store: Arc<RecordStore>, cache: Arc<MetricsCache>) -> Self {
        Self { store, cache }
    }

    /// Totals and liveness breakdown.
    pub fn quick_stats(&self) -> Result<Value, StoreError> {
        self.cache.get_or_compute(keys::QUICK_STATS, QUICK_TTL, || {
            let total = self.store.count()?;
            let checked = self.store.checked_count()?;
            let (alive, dead, unknown) = self.store.liveness_counts()?;
            Ok(json!({
                "total": total,
                "checked": checked,
                "alive": alive,
                "dead": dead,
                "unknown": unknown,
            }))
        })
    }

    /// Enrichment coverage of the collection.
    pub fn summary_stats(&self) -> Result<Value, StoreError> {
        self.cache
            .get_or_compute(keys::SUMMARY_STATS, SUMMARY_TTL, || {
                let total = self.store.count()?;
                let categorized: i64 =
                    self.store.counts_by("category")?.iter().map(|(_, n)| n).sum();
                let with_platform: i64 =
                    self.store.counts_by("platform")?.iter().map(|(_, n)| n).sum();
                let checked = self.store.checked_count()?;
                Ok(json!({
                    "total": total,
                    "checked": checked,
                    "categorized": categorized,
                    "with_platform": with_platform,
                }))
            })
    }

    /// Bookmark count per category, most common first.
    pub fn category_stats(&self) -> Result<Value, StoreError> {
        self.cache
            .get_or_compute(keys::CATEGORY_STATS, CATEGORY_TTL, || {
                Ok(counts_to_json(self.store.counts_by("category")?))
            })
    }

    /// Bookmark count per domain, most common first.
    pub fn domain_stats(&self) -> Result<Value, StoreError> {
        self.cache.get_or_compute(keys::DOMAIN_STATS, DOMAIN_TTL, || {
            Ok(counts_to_json(self.store.counts_by("domain")?))
        })
    }

    /// Bookmark count per recognized platform.
    pub fn platform_stats(&self) -> Result<Value, StoreError> {
        self.cache
            .get_or_compute(keys::PLATFORM_STATS, PLATFORM_TTL, || {
                Ok(counts_to_json(self.store.counts_by("platform")?))
            })
    }

    /// The creators the collection follows most, top ten.
    pub fn expertise_stats(&self) -> Result<Value, StoreError> {
        self.cache
            .get_or_compute(keys::EXPERTISE_STATS, EXPERTISE_TTL, || {
                let mut counts = self.store.counts_by("creator")?;
                counts.truncate(EXPERTISE_TOP_N);
                Ok(counts_to_json(counts))
            })
    }
}

fn counts_to_json(counts: Vec<(String, i64)>) -> Value {
    Value::Array(
        counts
            .into_iter()
            .map(|(name, count)| json!({ "name": name, "count": count }))
            .collect(),
    )
}
