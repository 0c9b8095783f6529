//! Attachment Search - full-text search over a note store's PDF attachments.
//!
//! The crate keeps a SQLite FTS5 index of attachment text in step with the
//! host application, answers search queries enriched with the notes that
//! reference each match, and provides the client-side state machine for a
//! keyboard-driven search surface.
//!
//! The host is reached only through the traits in [`host`].
//!
//! # Example
//!
//! ```rust,ignore
//! use attachment_search::{AttachmentSearch, DataApiClient};
//!
//! let api = Arc::new(DataApiClient::new("http://127.0.0.1:41184", Some(token))?);
//! let search = AttachmentSearch::builder(data_dir, resource_dir)
//!     .catalog(api.clone())
//!     .notes(api)
//!     .navigator(navigator)
//!     .build()?;
//!
//! let _scheduler = search.start_scheduler(IndexConfig::DEFAULT_INTERVAL);
//! let rows = search.search("invoice 2023").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod host;
pub mod index;
pub mod protocol;
pub mod search;
pub mod sync;

mod api;

pub use api::AttachmentSearchBuilder;
pub use client::{RpcTransport, SearchClient, SearchSession, SearchTransport};
pub use config::{IndexerConfig, OrphanPolicy, SearchConfig};
pub use error::{AttachmentSearchError, Result};
pub use extract::{LayoutTextExtractor, PdfLayoutSource, TextExtractor};
pub use host::{DataApiClient, Navigator, NoteLookup, NoteRef, Resource, ResourceCatalog};
pub use index::{IndexStatus, IndexStore, SearchMatch};
pub use protocol::{GotoRequest, Message, ProtocolHandler, SearchResult};
pub use search::QueryService;
pub use sync::{IndexScheduler, IndexSchedulerHandle, ResourceIndexer, SyncOutcome, SyncReport};

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Backend entry point: the indexer plus the protocol handler over one
/// index database.
#[derive(Clone)]
pub struct AttachmentSearch {
    data_dir: PathBuf,
    indexer: Arc<ResourceIndexer>,
    protocol: ProtocolHandler,
}

impl AttachmentSearch {
    pub fn builder(
        data_dir: impl Into<PathBuf>,
        resource_dir: impl Into<PathBuf>,
    ) -> AttachmentSearchBuilder {
        AttachmentSearchBuilder::new(data_dir, resource_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn indexer(&self) -> &Arc<ResourceIndexer> {
        &self.indexer
    }

    pub fn protocol(&self) -> &ProtocolHandler {
        &self.protocol
    }

    // ========================================
    // Protocol
    // ========================================

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.protocol.search(query).await
    }

    pub async fn goto(&self, request: &GotoRequest) -> Result<()> {
        self.protocol.goto(request).await
    }

    /// Answer one wire-protocol message.
    pub async fn handle_message(&self, message: Message) -> Result<Value> {
        self.protocol.handle(message).await
    }

    // ========================================
    // Index maintenance
    // ========================================

    pub async fn update_index(&self) -> Result<SyncOutcome> {
        self.indexer.update().await
    }

    pub async fn rebuild_index(&self) -> Result<SyncOutcome> {
        self.indexer.rebuild().await
    }

    pub fn index_status(&self) -> Result<IndexStatus> {
        self.indexer.status()
    }

    /// Start periodic updates. Updates stop when the handle is dropped.
    pub fn start_scheduler(&self, interval: Duration) -> IndexSchedulerHandle {
        IndexScheduler::start(self.indexer.clone(), interval)
    }
}
