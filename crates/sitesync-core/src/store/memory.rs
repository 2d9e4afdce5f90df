//! Process-local queue store

use std::sync::Mutex;

use async_trait::async_trait;

use super::QueueStore;
use crate::models::QueueItem;
use crate::Result;

/// Queue store that lives only as long as the process.
///
/// Useful for embedding without a database file and for tests.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<QueueItem>>,
    last_sync_at: Mutex<Option<i64>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_items(items: Vec<QueueItem>) -> Self {
        Self {
            items: Mutex::new(items),
            last_sync_at: Mutex::new(None),
        }
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn try_load(&self) -> Result<Vec<QueueItem>> {
        self.items
            .lock()
            .map(|items| items.clone())
            .map_err(|_| crate::Error::Storage("memory store lock poisoned".to_string()))
    }

    async fn save(&self, items: &[QueueItem]) -> Result<()> {
        let mut guard = self
            .items
            .lock()
            .map_err(|_| crate::Error::Storage("memory store lock poisoned".to_string()))?;
        *guard = items.to_vec();
        Ok(())
    }

    async fn load_last_sync_at(&self) -> Option<i64> {
        self.last_sync_at.lock().ok().and_then(|at| *at)
    }

    async fn save_last_sync_at(&self, at: i64) -> Result<()> {
        let mut guard = self
            .last_sync_at
            .lock()
            .map_err(|_| crate::Error::Storage("memory store lock poisoned".to_string()))?;
        *guard = Some(at);
        Ok(())
    }
}
