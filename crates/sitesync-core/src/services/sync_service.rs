//! Shared queue service wiring used by clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::db::{Database, LibSqlLocalStateRepository};
use crate::identity::get_or_create_device_id;
use crate::models::DeviceId;
use crate::store::LibSqlQueueStore;
use crate::sync::{ConnectivityMonitor, OfflineQueue, SyncEngine, SyncTransport};
use crate::Result;

/// Opened database, queue, and device identity for one local install.
#[derive(Clone)]
pub struct SyncService {
    queue: Arc<OfflineQueue<LibSqlQueueStore>>,
    device_id: DeviceId,
    db_path: Option<PathBuf>,
}

impl SyncService {
    /// Open the service over a database file, creating it if needed.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let db = Database::open(&db_path).await?;
        tracing::debug!("Opened queue database at {}", db_path.display());
        Self::from_database(db, Some(db_path)).await
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Self::from_database(db, None).await
    }

    async fn from_database(db: Database, db_path: Option<PathBuf>) -> Result<Self> {
        let device_id = get_or_create_device_id(&LibSqlLocalStateRepository::new(db.connection()))
            .await?;
        let store = LibSqlQueueStore::new(Arc::new(db));
        let queue = Arc::new(OfflineQueue::open(store).await);
        Ok(Self {
            queue,
            device_id,
            db_path,
        })
    }

    pub const fn queue(&self) -> &Arc<OfflineQueue<LibSqlQueueStore>> {
        &self.queue
    }

    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Build a sync engine sharing this service's queue.
    pub fn engine<T: SyncTransport>(
        &self,
        transport: T,
        connectivity: ConnectivityMonitor,
        config: EngineConfig,
    ) -> SyncEngine<LibSqlQueueStore, T> {
        SyncEngine::new(
            Arc::clone(&self.queue),
            transport,
            self.device_id.clone(),
            connectivity,
            config,
        )
    }
}
