//! Periodic index updates.
//!
//! Every tick spawns an update. A tick that lands while the previous
//! update is still running is turned away by the indexer itself.

use super::indexer::{ResourceIndexer, SyncOutcome};
use crate::config::IndexConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Handle to a running scheduler. Dropping stops it.
pub struct IndexSchedulerHandle {
    interval: Duration,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl IndexSchedulerHandle {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop scheduling new updates. An update already in flight finishes.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stop and wait for the tick loop to exit.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for IndexSchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Runs [`ResourceIndexer::update`] on a fixed interval, first tick
/// immediately.
///
/// Intervals shorter than [`IndexConfig::MIN_INTERVAL`] are raised to it.
pub struct IndexScheduler;

impl IndexScheduler {
    pub fn start(indexer: Arc<ResourceIndexer>, interval: Duration) -> IndexSchedulerHandle {
        let interval = if interval < IndexConfig::MIN_INTERVAL {
            warn!(
                "Index interval {:?} is too short, using {:?}",
                interval,
                IndexConfig::MIN_INTERVAL
            );
            IndexConfig::MIN_INTERVAL
        } else {
            interval
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        info!("Index scheduler started, interval {:?}", interval);

        let task_handle = tokio::spawn(Self::tick_loop(indexer, interval, shutdown_rx));

        IndexSchedulerHandle {
            interval,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        }
    }

    async fn tick_loop(
        indexer: Arc<ResourceIndexer>,
        interval: Duration,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Index scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let indexer = indexer.clone();
                    tokio::spawn(async move {
                        match indexer.update().await {
                            Ok(SyncOutcome::Completed(report)) => {
                                debug!("Scheduled index update done: {} indexed", report.indexed);
                            }
                            Ok(SyncOutcome::AlreadyRunning) => {
                                debug!("Scheduled index update skipped: previous run still active");
                            }
                            Err(e) => error!("Scheduled index update failed: {}", e),
                        }
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use crate::extract::TextExtractor;
    use crate::host::{ResourceCatalog, ResourcePage};
    use crate::index::IndexStore;
    use crate::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingCatalog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceCatalog for CountingCatalog {
        async fn list_resources(&self, _page: u32) -> Result<ResourcePage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResourcePage::default())
        }
    }

    struct NoText;

    impl TextExtractor for NoText {
        fn extract(&self, _path: &Path) -> Result<String> {
            Ok(String::new())
        }
    }

    fn setup(dir: &TempDir) -> (Arc<CountingCatalog>, Arc<ResourceIndexer>) {
        let catalog = Arc::new(CountingCatalog::default());
        let indexer = Arc::new(ResourceIndexer::new(
            IndexStore::open_in_dir(dir.path()).unwrap(),
            catalog.clone(),
            Arc::new(NoText),
            IndexerConfig::new(dir.path()),
        ));
        (catalog, indexer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_on_interval() {
        let dir = TempDir::new().unwrap();
        let (catalog, indexer) = setup(&dir);

        let handle = IndexScheduler::start(indexer, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(125)).await;
        handle.join().await;

        assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticking() {
        let dir = TempDir::new().unwrap();
        let (catalog, indexer) = setup(&dir);

        let handle = IndexScheduler::start(indexer, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.join().await;
        let after_shutdown = catalog.calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(catalog.calls.load(Ordering::SeqCst), after_shutdown);
        assert_eq!(after_shutdown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let dir = TempDir::new().unwrap();
        let (catalog, indexer) = setup(&dir);

        let handle = IndexScheduler::start(indexer, Duration::ZERO);
        assert_eq!(handle.interval(), IndexConfig::MIN_INTERVAL);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        handle.join().await;
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
    }
}
