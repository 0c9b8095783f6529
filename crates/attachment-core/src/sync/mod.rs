//! Keeping the index in step with the host.

mod indexer;
mod locks;
mod scheduler;

pub use indexer::{ResourceIndexer, SyncOutcome, SyncReport};
pub use locks::IdLocks;
pub use scheduler::{IndexScheduler, IndexSchedulerHandle};
