//! Schema version gate and destructive rebuild of the index relations.

use crate::config::{FtsConfig, StoreConfig};
use crate::Result;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

/// Manager for the full-text and index-time relations.
///
/// Only `resources_fts` and `index_time` are ever dropped or cleared; the
/// settings relation survives a rebuild apart from its `version` row.
pub struct SchemaManager<'a> {
    config: &'a FtsConfig,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager.
    pub fn new(config: &'a FtsConfig) -> Self {
        Self { config }
    }

    /// Check if a table (or virtual table) exists.
    pub fn table_exists(&self, conn: &Connection, name: &str) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn ensure_settings(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (name TEXT PRIMARY KEY, value TEXT)",
            StoreConfig::SETTINGS_TABLE
        ))?;
        Ok(())
    }

    /// Read the persisted schema version.
    ///
    /// Returns `None` when the row is missing or holds something that is not
    /// an integer.
    pub fn current_version(&self, conn: &Connection) -> Result<Option<i64>> {
        self.ensure_settings(conn)?;
        let value: Option<Value> = conn
            .query_row(
                &format!(
                    "SELECT value FROM {} WHERE name = ?1",
                    StoreConfig::SETTINGS_TABLE
                ),
                [StoreConfig::VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match value {
            Some(Value::Integer(v)) => Some(v),
            Some(Value::Text(s)) => s.trim().parse().ok(),
            Some(Value::Real(r)) => Some(r as i64),
            _ => None,
        })
    }

    /// Make sure the on-disk schema matches the compiled version.
    ///
    /// Returns `true` when a destructive rebuild was performed.
    pub fn ensure_schema(&self, conn: &Connection) -> Result<bool> {
        let version = self.current_version(conn)?;
        info!(
            "Index schema version: compiled {}, on disk {:?}",
            StoreConfig::SCHEMA_VERSION,
            version
        );

        let tables_present = self.table_exists(conn, &self.config.table_name)?
            && self.table_exists(conn, StoreConfig::INDEX_TIME_TABLE)?;

        if version == Some(StoreConfig::SCHEMA_VERSION) && tables_present {
            return Ok(false);
        }

        info!("Schema version mismatch - rebuilding the index");
        self.rebuild_all(conn)?;
        Ok(true)
    }

    /// Drop and recreate both index relations, compact the file, then
    /// persist the version.
    ///
    /// The version is written last so an interrupted rebuild is repeated on
    /// the next open.
    pub fn rebuild_all(&self, conn: &Connection) -> Result<()> {
        self.ensure_settings(conn)?;

        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE VIRTUAL TABLE {table} USING fts5(
                 id UNINDEXED,
                 title,
                 text,
                 tokenize='{tokenizer}'
             );",
            table = self.config.table_name,
            tokenizer = self.config.tokenizer
        ))?;
        debug!("Recreated FTS5 table {}", self.config.table_name);

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, index_time INTEGER);
             DELETE FROM {table};",
            table = StoreConfig::INDEX_TIME_TABLE
        ))?;

        conn.execute_batch("VACUUM")?;

        conn.execute(
            &format!(
                "INSERT INTO {} (name, value) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                StoreConfig::SETTINGS_TABLE
            ),
            params![
                StoreConfig::VERSION_KEY,
                StoreConfig::SCHEMA_VERSION.to_string()
            ],
        )?;

        info!("Rebuilt index at schema version {}", StoreConfig::SCHEMA_VERSION);
        Ok(())
    }
}
