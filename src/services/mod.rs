// LinkShelf services
// Services implement the enrichment pipeline: URL parsing, categorization,
// fetching, merging, the worker pool, and the derived-metrics layer.

pub mod categorizer;
pub mod enrichment_pool;
pub mod metadata_fetcher;
pub mod metrics_cache;
pub mod platform_merger;
pub mod platform_parser;
pub mod stats_service;
