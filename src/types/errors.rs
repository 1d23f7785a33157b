use std::fmt;

// === StoreError ===

/// Errors related to record store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Bookmark with the given ID was not found.
    NotFound(String),
    /// Database operation failed.
    Database(String),
    /// A stored JSON column could not be serialized.
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            StoreError::Database(msg) => write!(f, "Record store database error: {}", msg),
            StoreError::Serialization(msg) => {
                write!(f, "Record store serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StoreError {}

// === QueueError ===

/// Errors related to enrichment queue operations.
#[derive(Debug)]
pub enum QueueError {
    /// Queue entry with the given ID was not found.
    NotFound(String),
    /// Database operation failed.
    Database(String),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::NotFound(id) => write!(f, "Queue entry not found: {}", id),
            QueueError::Database(msg) => write!(f, "Queue database error: {}", msg),
        }
    }
}

impl std::error::Error for QueueError {}

// === ConfigError ===

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the config file.
    Io(String),
    /// The config file could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// === EnrichError ===

/// Errors that can abort an enrichment run before any item is processed.
///
/// Item-level failures never surface here; they are recorded on the record
/// and counted in the batch summary.
#[derive(Debug)]
pub enum EnrichError {
    /// Enrichment is disabled in the configuration.
    Disabled,
    /// The record store failed during batch setup or source selection.
    Store(String),
    /// The queue failed during source selection.
    Queue(String),
    /// The HTTP client could not be constructed.
    Setup(String),
}

impl fmt::Display for EnrichError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichError::Disabled => write!(f, "Enrichment is disabled"),
            EnrichError::Store(msg) => write!(f, "Enrichment store error: {}", msg),
            EnrichError::Queue(msg) => write!(f, "Enrichment queue error: {}", msg),
            EnrichError::Setup(msg) => write!(f, "Enrichment setup error: {}", msg),
        }
    }
}

impl std::error::Error for EnrichError {}

impl From<StoreError> for EnrichError {
    fn from(e: StoreError) -> Self {
        EnrichError::Store(e.to_string())
    }
}

impl From<QueueError> for EnrichError {
    fn from(e: QueueError) -> Self {
        EnrichError::Queue(e.to_string())
    }
}
