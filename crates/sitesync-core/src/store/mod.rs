//! Durable persistence of the offline queue snapshot.
//!
//! Callers always read the full sequence, mutate their copy, and write it back
//! with [`QueueStore::save`]. There are no partial-item updates.
//!
//! Writers read through [`QueueStore::try_load`] so a snapshot that could not
//! be read is never replaced by one built on an empty base.

mod libsql_store;
mod memory;

use async_trait::async_trait;

use crate::models::QueueItem;
use crate::Result;

pub use libsql_store::LibSqlQueueStore;
pub use memory::MemoryQueueStore;

/// Whole-snapshot storage for queue items and sync bookkeeping.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persisted items in insertion order, failing only when storage could
    /// not be read at all.
    ///
    /// A missing snapshot is empty. A snapshot that was read but cannot be
    /// decoded is set aside and also reads as empty.
    async fn try_load(&self) -> Result<Vec<QueueItem>>;

    /// Fail-open variant of [`QueueStore::try_load`] for readers.
    async fn load(&self) -> Vec<QueueItem> {
        match self.try_load().await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!("Failed to read queue snapshot, treating as empty: {}", error);
                Vec::new()
            }
        }
    }

    /// Atomically replace the persisted snapshot.
    async fn save(&self, items: &[QueueItem]) -> Result<()>;

    /// Completion time of the last successful sync cycle (Unix ms).
    async fn load_last_sync_at(&self) -> Option<i64>;

    async fn save_last_sync_at(&self, at: i64) -> Result<()>;
}
