//! Schema migrations for the LinkShelf SQLite database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Migrations are versioned — each runs exactly once and is recorded in
/// the `schema_version` table. Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // Enable WAL and foreign keys (always, not versioned)
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Initial schema: bookmarks and enrichment queue")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: Create the bookmark record table and the enrichment queue.
///
/// List- and object-valued enrichment fields (keywords, raw metadata,
/// platform side-table) are stored as JSON text columns.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bookmarks (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            domain TEXT NOT NULL,
            date_added INTEGER NOT NULL,
            description TEXT,
            keywords TEXT NOT NULL DEFAULT '[]',
            category TEXT,
            is_alive INTEGER,
            last_checked INTEGER,
            favicon_url TEXT,
            content_snippet TEXT,
            raw_metadata TEXT,
            platform TEXT,
            creator TEXT,
            content_type TEXT,
            platform_data TEXT,
            enrichment_error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_bookmarks_domain ON bookmarks(domain);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_last_checked ON bookmarks(last_checked);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_category ON bookmarks(category);

        CREATE TABLE IF NOT EXISTS enrichment_queue (
            queue_id TEXT PRIMARY KEY,
            bookmark_id TEXT NOT NULL UNIQUE,
            added_at INTEGER NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_queue_priority ON enrichment_queue(priority);
        ",
    )
}
