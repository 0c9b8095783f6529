//! Builder for wiring an [`AttachmentSearch`] instance.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{IndexerConfig, OrphanPolicy, SearchConfig};
use crate::error::{AttachmentSearchError, Result};
use crate::extract::{LayoutTextExtractor, PdfLayoutSource, TextExtractor};
use crate::host::{Navigator, NoteLookup, ResourceCatalog};
use crate::index::IndexStore;
use crate::protocol::ProtocolHandler;
use crate::search::QueryService;
use crate::sync::ResourceIndexer;
use crate::AttachmentSearch;

/// Builder for [`AttachmentSearch`].
///
/// ```rust,ignore
/// let search = AttachmentSearch::builder(data_dir, resource_dir)
///     .catalog(api.clone())
///     .notes(api)
///     .navigator(Arc::new(MyNavigator))
///     .build()?;
/// ```
pub struct AttachmentSearchBuilder {
    data_dir: PathBuf,
    indexer_config: IndexerConfig,
    search_config: SearchConfig,
    auto_create_dirs: bool,
    catalog: Option<Arc<dyn ResourceCatalog>>,
    notes: Option<Arc<dyn NoteLookup>>,
    navigator: Option<Arc<dyn Navigator>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl AttachmentSearchBuilder {
    /// `data_dir` holds the index database; `resource_dir` is where the host
    /// stores attachment files.
    pub fn new(data_dir: impl Into<PathBuf>, resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            indexer_config: IndexerConfig::new(resource_dir),
            search_config: SearchConfig::default(),
            auto_create_dirs: true,
            catalog: None,
            notes: None,
            navigator: None,
            extractor: None,
        }
    }

    /// Create the data directory if missing.
    ///
    /// Default: `true`
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn ResourceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn notes(mut self, notes: Arc<dyn NoteLookup>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Replace the PDF extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.search_config.orphan_policy = policy;
        self
    }

    /// Record an index time for unsupported attachments so they are not
    /// looked at again.
    ///
    /// Default: `true`
    pub fn mark_unsupported_indexed(mut self, enable: bool) -> Self {
        self.indexer_config.mark_unsupported_indexed = enable;
        self
    }

    /// Maximum attachments processed at once within a listing page.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.indexer_config.concurrency = concurrency.max(1);
        self
    }

    fn missing(what: &str) -> AttachmentSearchError {
        AttachmentSearchError::Config {
            message: format!("AttachmentSearch requires a {}", what),
        }
    }

    pub fn build(self) -> Result<AttachmentSearch> {
        if !self.data_dir.exists() {
            if self.auto_create_dirs {
                std::fs::create_dir_all(&self.data_dir)
                    .map_err(|e| AttachmentSearchError::io_with_path(e, &self.data_dir))?;
            } else {
                return Err(AttachmentSearchError::Config {
                    message: format!("Data directory does not exist: {}", self.data_dir.display()),
                });
            }
        }

        let catalog = self.catalog.ok_or_else(|| Self::missing("resource catalog"))?;
        let notes = self.notes.ok_or_else(|| Self::missing("note lookup"))?;
        let navigator = self.navigator.ok_or_else(|| Self::missing("navigator"))?;
        let extractor: Arc<dyn TextExtractor> = match self.extractor {
            Some(extractor) => extractor,
            None => Arc::new(LayoutTextExtractor::new(PdfLayoutSource)),
        };

        let store = IndexStore::open_in_dir(&self.data_dir)?;
        let query = QueryService::new(store.clone(), notes, self.search_config);
        let indexer = ResourceIndexer::new(store, catalog, extractor, self.indexer_config);

        Ok(AttachmentSearch {
            data_dir: self.data_dir,
            indexer: Arc::new(indexer),
            protocol: ProtocolHandler::new(query, navigator),
        })
    }
}
