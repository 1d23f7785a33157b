//! Record Store for LinkShelf.
//!
//! Implements `RecordStoreTrait` — keyed persistent storage for bookmark
//! records, backed by SQLite via `rusqlite`. Also provides the selection
//! queries the enrichment pool uses for its three-tier source selection.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::params;

use crate::database::Database;
use crate::types::bookmark::{BookmarkRecord, Liveness, PlatformData};
use crate::types::errors::StoreError;

/// Trait defining record store operations.
pub trait RecordStoreTrait {
    fn get(&self, id: &str) -> Result<Option<BookmarkRecord>, StoreError>;
    fn insert(&self, record: &BookmarkRecord) -> Result<(), StoreError>;
    /// Unconditional write; an existing row with the same id is replaced.
    fn upsert(&self, record: &BookmarkRecord) -> Result<(), StoreError>;
    fn bulk_upsert(&self, records: &[BookmarkRecord]) -> Result<(), StoreError>;
    fn query_all(&self) -> Result<Vec<BookmarkRecord>, StoreError>;
    /// Deletes a record; any queue entry for it is removed as well.
    fn remove(&self, id: &str) -> Result<(), StoreError>;
    fn count(&self) -> Result<usize, StoreError>;
}

/// Record store backed by a shared SQLite database.
pub struct RecordStore {
    db: Arc<Database>,
}

impl RecordStore {
    /// Creates a new `RecordStore` using the provided database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns the current UNIX timestamp in seconds.
    pub fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    const COLUMNS: &'static str = "id, url, title, domain, date_added, description, keywords, \
         category, is_alive, last_checked, favicon_url, content_snippet, raw_metadata, \
         platform, creator, content_type, platform_data, enrichment_error";

    /// Reads a single bookmark row into a record.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<BookmarkRecord> {
        let keywords: String = row.get(6)?;
        let raw_metadata: Option<String> = row.get(12)?;
        let platform_data: Option<String> = row.get(16)?;
        let is_alive: Option<bool> = row.get(8)?;

        Ok(BookmarkRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            domain: row.get(3)?,
            date_added: row.get(4)?,
            description: row.get(5)?,
            keywords: serde_json::from_str(&keywords).unwrap_or_default(),
            category: row.get(7)?,
            is_alive: Liveness::from_column(is_alive),
            last_checked: row.get(9)?,
            favicon_url: row.get(10)?,
            content_snippet: row.get(11)?,
            raw_metadata: raw_metadata.and_then(|s| serde_json::from_str(&s).ok()),
            platform: row.get(13)?,
            creator: row.get(14)?,
            content_type: row.get(15)?,
            platform_data: platform_data
                .and_then(|s| serde_json::from_str::<PlatformData>(&s).ok()),
            enrichment_error: row.get(17)?,
        })
    }

    /// Serializes the JSON-valued columns of a record.
    fn json_columns(
        record: &BookmarkRecord,
    ) -> Result<(String, Option<String>, Option<String>), StoreError> {
        let keywords = serde_json::to_string(&record.keywords)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let raw_metadata = record
            .raw_metadata
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let platform_data = record
            .platform_data
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok((keywords, raw_metadata, platform_data))
    }

    fn write_record(
        conn: &rusqlite::Connection,
        sql: &str,
        record: &BookmarkRecord,
    ) -> Result<usize, StoreError> {
        let (keywords, raw_metadata, platform_data) = Self::json_columns(record)?;
        conn.execute(
            sql,
            params![
                record.id,
                record.url,
                record.title,
                record.domain,
                record.date_added,
                record.description,
                keywords,
                record.category,
                record.is_alive.as_column(),
                record.last_checked,
                record.favicon_url,
                record.content_snippet,
                raw_metadata,
                record.platform,
                record.creator,
                record.content_type,
                platform_data,
                record.enrichment_error,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    const INSERT_SQL: &'static str = "INSERT INTO bookmarks (id, url, title, domain, date_added, description, keywords, \
         category, is_alive, last_checked, favicon_url, content_snippet, raw_metadata, \
         platform, creator, content_type, platform_data, enrichment_error) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)";

    const UPSERT_SQL: &'static str = "INSERT OR REPLACE INTO bookmarks (id, url, title, domain, date_added, description, keywords, \
         category, is_alive, last_checked, favicon_url, content_snippet, raw_metadata, \
         platform, creator, content_type, platform_data, enrichment_error) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)";

    fn query_records(&self, sql: &str, limit: Option<usize>) -> Result<Vec<BookmarkRecord>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = match limit {
            Some(n) => stmt.query_map(params![n as i64], Self::row_to_record),
            None => stmt.query_map([], Self::row_to_record),
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    /// Never-checked HTTP(S) bookmarks, oldest first.
    ///
    /// The queue-empty fallback of the pool's source selection; the queue is
    /// an acceleration structure, not the sole source of truth.
    pub fn select_never_checked_http(&self, limit: usize) -> Result<Vec<BookmarkRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {} FROM bookmarks \
                 WHERE last_checked IS NULL AND (url LIKE 'http://%' OR url LIKE 'https://%') \
                 ORDER BY date_added ASC LIMIT ?1",
                Self::COLUMNS
            ),
            Some(limit),
        )
    }

    /// Forced-mode selection: never-checked bookmarks first, then
    /// already-checked ones ordered by oldest `last_checked`.
    pub fn select_for_forced(&self, limit: usize) -> Result<Vec<BookmarkRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {} FROM bookmarks \
                 ORDER BY (last_checked IS NOT NULL) ASC, COALESCE(last_checked, 0) ASC, date_added ASC \
                 LIMIT ?1",
                Self::COLUMNS
            ),
            Some(limit),
        )
    }

    /// Counts rows grouped by one column, NULLs excluded, descending.
    pub fn counts_by(&self, column: &str) -> Result<Vec<(String, i64)>, StoreError> {
        // Column names come from call sites, never user input
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {c}, COUNT(*) FROM bookmarks WHERE {c} IS NOT NULL AND {c} != '' \
                 GROUP BY {c} ORDER BY COUNT(*) DESC",
                c = column
            ))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    /// Counts of alive / dead / unknown records.
    pub fn liveness_counts(&self) -> Result<(i64, i64, i64), StoreError> {
        let conn = self.db.connection();
        conn.query_row(
            "SELECT \
                 COALESCE(SUM(is_alive = 1), 0), \
                 COALESCE(SUM(is_alive = 0), 0), \
                 COALESCE(SUM(is_alive IS NULL), 0) \
             FROM bookmarks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Number of records that have been through at least one enrichment attempt.
    pub fn checked_count(&self) -> Result<i64, StoreError> {
        let conn = self.db.connection();
        conn.query_row(
            "SELECT COUNT(*) FROM bookmarks WHERE last_checked IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl RecordStoreTrait for RecordStore {
    /// Fetches a record by ID.
    fn get(&self, id: &str) -> Result<Option<BookmarkRecord>, StoreError> {
        let conn = self.db.connection();
        let result = conn.query_row(
            &format!("SELECT {} FROM bookmarks WHERE id = ?1", Self::COLUMNS),
            params![id],
            Self::row_to_record,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    /// Inserts a new record. Fails if the ID already exists.
    fn insert(&self, record: &BookmarkRecord) -> Result<(), StoreError> {
        let conn = self.db.connection();
        Self::write_record(&conn, Self::INSERT_SQL, record)?;
        Ok(())
    }

    fn upsert(&self, record: &BookmarkRecord) -> Result<(), StoreError> {
        let conn = self.db.connection();
        Self::write_record(&conn, Self::UPSERT_SQL, record)?;
        Ok(())
    }

    /// Upserts a batch of records inside one transaction.
    fn bulk_upsert(&self, records: &[BookmarkRecord]) -> Result<(), StoreError> {
        let mut conn = self.db.connection();
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        for record in records {
            Self::write_record(&tx, Self::UPSERT_SQL, record)?;
        }
        tx.commit().map_err(|e| StoreError::Database(e.to_string()))
    }

    fn query_all(&self) -> Result<Vec<BookmarkRecord>, StoreError> {
        self.query_records(
            &format!("SELECT {} FROM bookmarks ORDER BY date_added ASC", Self::COLUMNS),
            None,
        )
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.db.connection();

        // Cascade: a deleted record must not leave a live queue entry behind
        conn.execute(
            "DELETE FROM enrichment_queue WHERE bookmark_id = ?1",
            params![id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let affected = conn
            .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.db.connection();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(count as usize)
    }
}
