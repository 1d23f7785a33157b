use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::errors::ConfigError;

fn default_enabled() -> bool {
    true
}

fn default_batch_size() -> usize {
    20
}

fn default_concurrency() -> usize {
    4
}

fn default_freshness_days() -> u64 {
    30
}

fn default_rate_limit_ms() -> u64 {
    50
}

/// Tunables for the enrichment pipeline.
///
/// Loaded from a JSON file when one exists; every field has a default so a
/// partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Master switch; a disabled pipeline refuses to start a batch.
    #[serde(default = "default_enabled")]
    pub enrichment_enabled: bool,
    /// Maximum number of bookmarks selected for one batch run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of logical workers draining the batch cursor.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Window during which an already-checked bookmark is not re-enriched.
    #[serde(default = "default_freshness_days")]
    pub freshness_days: u64,
    /// Pause between successive claims within one worker.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enrichment_enabled: default_enabled(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            freshness_days: default_freshness_days(),
            rate_limit_ms: default_rate_limit_ms(),
        }
    }
}

impl EnrichmentConfig {
    /// Loads configuration from a JSON file.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config file: {}", e)))
    }

    /// Freshness window in seconds.
    pub fn freshness_window_secs(&self) -> i64 {
        self.freshness_days as i64 * 86_400
    }
}
