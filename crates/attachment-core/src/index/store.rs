//! SQLite index store: full-text records plus per-resource index times.

use crate::config::{FtsConfig, StoreConfig};
use crate::{AttachmentSearchError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::debug;

use super::query::build_column_match;
use super::schema::SchemaManager;

/// A resource that matched a full-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    pub title: String,
}

/// Snapshot of the index for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub schema_version: Option<i64>,
    pub record_count: usize,
    pub tracked_count: usize,
    pub sync_running: bool,
}

/// SQLite index with FTS5 support.
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct IndexStore {
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
    fts_config: FtsConfig,
}

impl IndexStore {
    /// Create or open an index store at the given database path.
    ///
    /// Runs the schema version gate before returning, so a store that opens
    /// successfully is always safe to query.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_config(db_path, FtsConfig::default())
    }

    /// Open the store inside a data directory using the default file name.
    pub fn open_in_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(data_dir.as_ref().join(StoreConfig::DATABASE_FILENAME))
    }

    /// Create or open an index store with a custom FTS5 configuration.
    pub fn open_with_config(db_path: impl Into<PathBuf>, fts_config: FtsConfig) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| AttachmentSearchError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::configure_connection(&conn)?;
        SchemaManager::new(&fts_config).ensure_schema(&conn)?;

        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            fts_config,
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout={};
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
            StoreConfig::BUSY_TIMEOUT_MS
        ))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AttachmentSearchError::lock_poisoned())
    }

    /// Get the database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert or replace the full-text record for `id`.
    ///
    /// FTS5 tables have no unique constraint, so the old row is deleted in
    /// the same transaction as the insert.
    pub fn upsert_record(&self, id: &str, title: &str, text: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.replace_record(&tx, id, title, text)?;
        tx.commit()?;

        debug!("Upserted full-text record: {}", id);
        Ok(())
    }

    /// Record when `id` was last processed.
    pub fn touch_index_time(&self, id: &str, timestamp: i64) -> Result<()> {
        let conn = self.lock()?;
        write_index_time(&conn, id, timestamp)
    }

    /// Store freshly extracted text together with its index time.
    ///
    /// Both writes share one transaction: a record is never visible without
    /// the index time that marks it current.
    pub fn record_indexed(&self, id: &str, title: &str, text: &str, timestamp: i64) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.replace_record(&tx, id, title, text)?;
        write_index_time(&tx, id, timestamp)?;
        tx.commit()?;

        debug!("Indexed {} at {}", id, timestamp);
        Ok(())
    }

    fn replace_record(&self, conn: &Connection, id: &str, title: &str, text: &str) -> Result<()> {
        let table = &self.fts_config.table_name;
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
        conn.execute(
            &format!("INSERT INTO {} (id, title, text) VALUES (?1, ?2, ?3)", table),
            params![id, title, text],
        )?;
        Ok(())
    }

    /// Get when `id` was last processed, if ever.
    pub fn get_index_time(&self, id: &str) -> Result<Option<i64>> {
        let conn = self.lock()?;
        let time = conn
            .query_row(
                &format!(
                    "SELECT index_time FROM {} WHERE id = ?1",
                    StoreConfig::INDEX_TIME_TABLE
                ),
                params![id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        Ok(time.flatten())
    }

    /// Run a full-text query against the extracted text.
    ///
    /// Results come back in FTS5 `rank` order. Blank input returns nothing
    /// without touching the database.
    pub fn search(&self, query_text: &str) -> Result<Vec<SearchMatch>> {
        let expression = build_column_match("text", query_text);
        if expression.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, title FROM {table} WHERE {table} MATCH ?1 ORDER BY rank",
            table = self.fts_config.table_name
        ))?;
        let matches = stmt
            .query_map(params![expression], |row| {
                Ok(SearchMatch {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            "Query {:?} matched {} resources in {:.2}ms",
            expression,
            matches.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(matches)
    }

    /// Run store work on the blocking thread pool.
    pub async fn with_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&IndexStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| AttachmentSearchError::Database {
                message: format!("Store task failed: {}", e),
                source: None,
            })?
    }

    /// Wipe both index relations and reset the schema version.
    pub fn rebuild(&self) -> Result<()> {
        let conn = self.lock()?;
        SchemaManager::new(&self.fts_config).rebuild_all(&conn)
    }

    /// Number of full-text records.
    pub fn record_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: usize = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.fts_config.table_name),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of resources with an index time.
    pub fn tracked_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: usize = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", StoreConfig::INDEX_TIME_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Persisted schema version.
    pub fn schema_version(&self) -> Result<Option<i64>> {
        let conn = self.lock()?;
        SchemaManager::new(&self.fts_config).current_version(&conn)
    }

    /// Collect counts and version into a status snapshot.
    pub fn status(&self, sync_running: bool) -> Result<IndexStatus> {
        Ok(IndexStatus {
            schema_version: self.schema_version()?,
            record_count: self.record_count()?,
            tracked_count: self.tracked_count()?,
            sync_running,
        })
    }
}

fn write_index_time(conn: &Connection, id: &str, timestamp: i64) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} (id, index_time) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET index_time = excluded.index_time",
            StoreConfig::INDEX_TIME_TABLE
        ),
        params![id, timestamp],
    )?;
    Ok(())
}
