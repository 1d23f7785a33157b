// LinkShelf state managers
// Managers handle persistent state: the bookmark record store and the enrichment queue.

pub mod queue_manager;
pub mod record_store;
