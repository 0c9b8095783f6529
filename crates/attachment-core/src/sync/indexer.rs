//! Incremental attachment indexer.
//!
//! One sync run walks the host's attachment listing page by page, starting
//! at page 1, and brings every supported attachment's record up to date.
//! Runs never overlap: a trigger that arrives while a run is in flight is
//! answered with [`SyncOutcome::AlreadyRunning`].

use super::locks::IdLocks;
use crate::config::{IndexConfig, IndexerConfig};
use crate::extract::TextExtractor;
use crate::host::{Resource, ResourceCatalog};
use crate::index::{IndexStatus, IndexStore};
use crate::{AttachmentSearchError, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Counters for one completed sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Listing pages fetched.
    pub pages: u32,
    /// Distinct attachments seen in the listing.
    pub seen: usize,
    /// Attachments extracted and written.
    pub indexed: usize,
    /// Attachments whose record was already current.
    pub up_to_date: usize,
    /// Attachments skipped for an unsupported MIME type.
    pub unsupported: usize,
    /// Attachments that failed; their index time is left untouched.
    pub failed: usize,
    pub duration_ms: u64,
}

impl SyncReport {
    fn record(&mut self, outcome: ResourceOutcome) {
        match outcome {
            ResourceOutcome::Indexed => self.indexed += 1,
            ResourceOutcome::UpToDate => self.up_to_date += 1,
            ResourceOutcome::Unsupported => self.unsupported += 1,
            ResourceOutcome::Failed => self.failed += 1,
        }
    }
}

/// Result of asking the indexer to sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed(SyncReport),
    AlreadyRunning,
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            SyncOutcome::AlreadyRunning => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceOutcome {
    Indexed,
    UpToDate,
    Unsupported,
    Failed,
}

/// Clears the running flag when a run ends, including on error or cancel.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps the full-text index in step with the host's attachments.
pub struct ResourceIndexer {
    store: IndexStore,
    catalog: Arc<dyn ResourceCatalog>,
    extractor: Arc<dyn TextExtractor>,
    config: IndexerConfig,
    running: AtomicBool,
    id_locks: IdLocks,
}

impl ResourceIndexer {
    pub fn new(
        store: IndexStore,
        catalog: Arc<dyn ResourceCatalog>,
        extractor: Arc<dyn TextExtractor>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            extractor,
            config,
            running: AtomicBool::new(false),
            id_locks: IdLocks::new(),
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Whether a sync run is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current index statistics.
    pub fn status(&self) -> Result<IndexStatus> {
        self.store.status(self.is_running())
    }

    /// Bring the index up to date with the host's attachment listing.
    pub async fn update(&self) -> Result<SyncOutcome> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            info!("Index update already running, ignoring trigger");
            return Ok(SyncOutcome::AlreadyRunning);
        };
        self.run().await.map(SyncOutcome::Completed)
    }

    /// Drop every record and index time, then run a full update.
    pub async fn rebuild(&self) -> Result<SyncOutcome> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            info!("Index update already running, ignoring rebuild");
            return Ok(SyncOutcome::AlreadyRunning);
        };
        info!("Rebuilding attachment index");
        self.store.rebuild()?;
        self.run().await.map(SyncOutcome::Completed)
    }

    async fn run(&self) -> Result<SyncReport> {
        let start = Instant::now();
        let concurrency = self.config.concurrency.max(1);
        let mut report = SyncReport::default();
        let mut seen = HashSet::new();
        let mut page = IndexConfig::FIRST_PAGE;
        let mut stale_pages = 0;

        info!("Updating attachment index");

        loop {
            let listing = self.catalog.list_resources(page).await?;
            report.pages += 1;

            let batch: Vec<Resource> = listing
                .items
                .into_iter()
                .filter(|resource| seen.insert(resource.id.clone()))
                .collect();
            let batch_len = batch.len();
            report.seen += batch_len;

            let outcomes: Vec<ResourceOutcome> = stream::iter(batch)
                .map(|resource| self.index_resource(resource))
                .buffer_unordered(concurrency)
                .collect()
                .await;
            for outcome in outcomes {
                report.record(outcome);
            }

            if !listing.has_more {
                break;
            }
            // The listing can shift while it is walked; only a run of pages
            // with nothing new means it is looping.
            if batch_len == 0 {
                stale_pages += 1;
                if stale_pages >= IndexConfig::MAX_STALE_PAGES {
                    warn!(
                        "Listing pages up to {} had no new attachments but report more; stopping",
                        page
                    );
                    break;
                }
            } else {
                stale_pages = 0;
            }
            page += 1;
        }

        self.id_locks.prune();
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Index update finished: {} seen, {} indexed, {} up to date, {} unsupported, {} failed in {}ms",
            report.seen,
            report.indexed,
            report.up_to_date,
            report.unsupported,
            report.failed,
            report.duration_ms
        );
        Ok(report)
    }

    async fn index_resource(&self, resource: Resource) -> ResourceOutcome {
        let _lock = self.id_locks.acquire(&resource.id).await;
        match self.try_index(&resource).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    "Error indexing {} ({}): {}",
                    resource.id, resource.title, e
                );
                ResourceOutcome::Failed
            }
        }
    }

    async fn try_index(&self, resource: &Resource) -> Result<ResourceOutcome> {
        let id = resource.id.clone();
        let indexed_at = self
            .store
            .with_blocking(move |store| store.get_index_time(&id))
            .await?;
        if let Some(indexed_at) = indexed_at {
            if indexed_at > resource.updated_time {
                debug!("Skip {} ({}): up to date", resource.id, resource.title);
                return Ok(ResourceOutcome::UpToDate);
            }
        }

        if !self.config.is_supported(&resource.mime) {
            debug!(
                "Skip {} ({}): MIME type {} not supported",
                resource.id, resource.title, resource.mime
            );
            if self.config.mark_unsupported_indexed {
                let id = resource.id.clone();
                let timestamp = index_timestamp(resource);
                self.store
                    .with_blocking(move |store| store.touch_index_time(&id, timestamp))
                    .await?;
            }
            return Ok(ResourceOutcome::Unsupported);
        }

        let path = self.resource_path(resource);
        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| {
                AttachmentSearchError::extraction(
                    resource.id.clone(),
                    format!("extraction task failed: {}", e),
                )
            })?
            .map_err(|e| match e {
                AttachmentSearchError::Extraction { message, .. } => {
                    AttachmentSearchError::extraction(resource.id.clone(), message)
                }
                other => other,
            })?;

        debug!(
            "Extracted text from {} ({}): {}",
            resource.id,
            resource.title,
            preview(&text)
        );

        let (id, title) = (resource.id.clone(), resource.title.clone());
        let timestamp = index_timestamp(resource);
        self.store
            .with_blocking(move |store| store.record_indexed(&id, &title, &text, timestamp))
            .await?;
        Ok(ResourceOutcome::Indexed)
    }

    /// Location of an attachment's file inside the host's resource directory.
    fn resource_path(&self, resource: &Resource) -> PathBuf {
        let extension = if resource.mime.eq_ignore_ascii_case(IndexConfig::PDF_MIME) {
            Some(IndexConfig::PDF_EXTENSION)
        } else {
            resource.title.rsplit_once('.').map(|(_, ext)| ext)
        };
        match extension {
            Some(ext) if !ext.is_empty() => {
                self.config
                    .resource_dir
                    .join(format!("{}.{}", resource.id, ext))
            }
            _ => self.config.resource_dir.join(&resource.id),
        }
    }
}

/// Index time recorded for a resource: strictly after its `updated_time` so
/// an unchanged resource is skipped next run.
fn index_timestamp(resource: &Resource) -> i64 {
    Utc::now()
        .timestamp_millis()
        .max(resource.updated_time.saturating_add(1))
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(IndexConfig::LOG_PREVIEW_CHARS).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ResourcePage;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedCatalog(Vec<ResourcePage>);

    #[async_trait]
    impl ResourceCatalog for FixedCatalog {
        async fn list_resources(&self, page: u32) -> Result<ResourcePage> {
            Ok(self
                .0
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingExtractor {
        paths: Mutex<Vec<PathBuf>>,
    }

    impl TextExtractor for RecordingExtractor {
        fn extract(&self, path: &Path) -> Result<String> {
            self.paths.lock().unwrap().push(path.to_path_buf());
            Ok(format!("contents of {}", path.display()))
        }
    }

    fn resource(id: &str, mime: &str, updated_time: i64) -> Resource {
        Resource {
            id: id.to_string(),
            title: format!("{}.pdf", id),
            mime: mime.to_string(),
            updated_time,
        }
    }

    fn indexer(
        dir: &TempDir,
        pages: Vec<ResourcePage>,
        extractor: Arc<RecordingExtractor>,
    ) -> ResourceIndexer {
        let store = IndexStore::open_in_dir(dir.path()).unwrap();
        ResourceIndexer::new(
            store,
            Arc::new(FixedCatalog(pages)),
            extractor,
            IndexerConfig::new(dir.path().join("resources")),
        )
    }

    #[test]
    fn test_run_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = RunGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(RunGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(RunGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_index_timestamp_exceeds_future_updated_time() {
        let future = Utc::now().timestamp_millis() + 60_000;
        assert_eq!(
            index_timestamp(&resource("r", IndexConfig::PDF_MIME, future)),
            future + 1
        );
    }

    #[test]
    fn test_preview_truncates_and_flattens() {
        let long = "line\n".repeat(50);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert!(!p.contains('\n'));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_resource_path_uses_pdf_extension() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(RecordingExtractor::default());
        let indexer = indexer(
            &dir,
            vec![ResourcePage {
                items: vec![resource("abc", "application/PDF", 10)],
                has_more: false,
            }],
            extractor.clone(),
        );

        indexer.update().await.unwrap();

        let paths = extractor.paths.lock().unwrap();
        assert_eq!(*paths, vec![dir.path().join("resources").join("abc.pdf")]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_across_pages_indexed_once() {
        let dir = TempDir::new().unwrap();
        let extractor = Arc::new(RecordingExtractor::default());
        let indexer = indexer(
            &dir,
            vec![
                ResourcePage {
                    items: vec![resource("a", IndexConfig::PDF_MIME, 1)],
                    has_more: true,
                },
                ResourcePage {
                    items: vec![
                        resource("a", IndexConfig::PDF_MIME, 1),
                        resource("b", IndexConfig::PDF_MIME, 1),
                    ],
                    has_more: false,
                },
            ],
            extractor.clone(),
        );

        let outcome = indexer.update().await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.pages, 2);
        assert_eq!(report.seen, 2);
        assert_eq!(report.indexed, 2);
        assert_eq!(extractor.paths.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_policy_off_leaves_no_index_time() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open_in_dir(dir.path()).unwrap();
        let mut config = IndexerConfig::new(dir.path());
        config.mark_unsupported_indexed = false;
        let indexer = ResourceIndexer::new(
            store,
            Arc::new(FixedCatalog(vec![ResourcePage {
                items: vec![resource("img", "image/png", 5)],
                has_more: false,
            }])),
            Arc::new(RecordingExtractor::default()),
            config,
        );

        let outcome = indexer.update().await.unwrap();
        assert_eq!(outcome.report().unwrap().unsupported, 1);
        assert_eq!(indexer.store().get_index_time("img").unwrap(), None);
    }

    #[tokio::test]
    async fn test_status_reports_counts() {
        let dir = TempDir::new().unwrap();
        let indexer = indexer(
            &dir,
            vec![ResourcePage {
                items: vec![
                    resource("a", IndexConfig::PDF_MIME, 1),
                    resource("b", "text/plain", 1),
                ],
                has_more: false,
            }],
            Arc::new(RecordingExtractor::default()),
        );

        indexer.update().await.unwrap();
        let status = indexer.status().unwrap();
        assert_eq!(status.record_count, 1);
        assert_eq!(status.tracked_count, 2);
        assert!(!status.sync_running);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(SyncOutcome::AlreadyRunning).unwrap();
        assert_eq!(json["status"], "already_running");

        let json = serde_json::to_value(SyncOutcome::Completed(SyncReport::default())).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["upToDate"], 0);
    }
}
