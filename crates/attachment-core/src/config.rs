//! Centralized configuration for attachment indexing and search.
//!
//! Constant holder structs carry the fixed parameters; the runtime structs
//! (`IndexerConfig`, `SearchConfig`, `FtsConfig`) are what the host tunes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Persisted index layout.
pub struct StoreConfig;

impl StoreConfig {
    /// Bump whenever the shape of the persisted relations changes.
    pub const SCHEMA_VERSION: i64 = 1;
    pub const DATABASE_FILENAME: &'static str = "resources.sqlite";
    pub const FTS_TABLE: &'static str = "resources_fts";
    pub const INDEX_TIME_TABLE: &'static str = "index_time";
    pub const SETTINGS_TABLE: &'static str = "settings";
    pub const VERSION_KEY: &'static str = "version";
    pub const BUSY_TIMEOUT_MS: u64 = 30_000;
}

/// Indexer defaults.
pub struct IndexConfig;

impl IndexConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
    pub const DEFAULT_CONCURRENCY: usize = 4;
    pub const FIRST_PAGE: u32 = 1;
    /// Consecutive listing pages without a new id before a run gives up.
    pub const MAX_STALE_PAGES: u32 = 3;
    /// Shortest interval the scheduler accepts.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);
    pub const PDF_MIME: &'static str = "application/pdf";
    pub const PDF_EXTENSION: &'static str = "pdf";
    pub const LOG_PREVIEW_CHARS: usize = 100;
}

/// Interactive client defaults.
pub struct ClientConfig;

impl ClientConfig {
    pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const EVENT_CHANNEL_CAPACITY: usize = 64;
}

/// Host data API defaults.
pub struct DataApiConfig;

impl DataApiConfig {
    pub const DEFAULT_URL: &'static str = "http://127.0.0.1:41184";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const NOTE_CACHE_TTL: Duration = Duration::from_secs(30);
    pub const NOTE_CACHE_CAPACITY: u64 = 1_024;
    pub const RESOURCE_FIELDS: &'static str = "id,title,mime,updated_time";
    pub const NOTE_FIELDS: &'static str = "id,title";
}

/// Configuration for the FTS5 table.
#[derive(Debug, Clone)]
pub struct FtsConfig {
    /// Name of the FTS5 virtual table.
    pub table_name: String,
    /// Tokenizer configuration.
    pub tokenizer: String,
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            table_name: StoreConfig::FTS_TABLE.to_string(),
            tokenizer: "unicode61 remove_diacritics 1".to_string(),
        }
    }
}

/// Runtime configuration for the resource indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Directory holding attachment blobs as `<id>.<ext>`.
    pub resource_dir: PathBuf,
    /// How many resources of one listing page are processed at once.
    pub concurrency: usize,
    /// Mark unsupported types as indexed so later syncs skip them until
    /// they change. When false they are re-evaluated on every sync.
    pub mark_unsupported_indexed: bool,
    /// Mime types handed to the text extractor.
    pub supported_mimes: Vec<String>,
}

impl IndexerConfig {
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
            concurrency: IndexConfig::DEFAULT_CONCURRENCY,
            mark_unsupported_indexed: true,
            supported_mimes: vec![IndexConfig::PDF_MIME.to_string()],
        }
    }

    pub fn is_supported(&self, mime: &str) -> bool {
        self.supported_mimes.iter().any(|m| m.eq_ignore_ascii_case(mime))
    }
}

/// What to do with a match that no note references any more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Emit the match with `note: null`.
    #[default]
    Include,
    /// Leave the match out of the results.
    Omit,
}

/// Runtime configuration for the query service.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub orphan_policy: OrphanPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_mime_is_case_insensitive() {
        let config = IndexerConfig::new("/tmp/resources");
        assert!(config.is_supported("application/pdf"));
        assert!(config.is_supported("Application/PDF"));
        assert!(!config.is_supported("image/png"));
    }

    #[test]
    fn test_defaults_are_reasonable() {
        let config = IndexerConfig::new("/tmp/resources");
        assert!(config.concurrency > 0);
        assert!(config.mark_unsupported_indexed);
        assert_eq!(SearchConfig::default().orphan_policy, OrphanPolicy::Include);
        assert!(ClientConfig::DEBOUNCE_WINDOW > Duration::ZERO);
    }
}
