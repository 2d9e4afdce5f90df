//! Offline mutation queue: submission and local bookkeeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::models::{Mutation, OfflineId, QueueItem, QueueStatus};
use crate::state::SyncStatus;
use crate::store::QueueStore;
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// The local side of the queue.
///
/// Every read-modify-write of the snapshot goes through [`OfflineQueue::modify`]
/// so enqueue, reconciliation, and resolution never overwrite each other.
///
/// The queue also owns the single-flight flag: however many engines share
/// one queue, at most one exchange is outstanding for it.
pub struct OfflineQueue<S> {
    store: S,
    write_lock: Mutex<()>,
    sync_in_flight: AtomicBool,
    status: Arc<watch::Sender<SyncStatus>>,
}

impl<S> OfflineQueue<S> {
    /// Latest published status snapshot
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Receive a fresh snapshot on every transition
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub(crate) fn update_status(&self, update: impl FnOnce(&mut SyncStatus)) {
        self.status.send_modify(update);
    }

    pub(crate) fn status_sender(&self) -> &watch::Sender<SyncStatus> {
        &self.status
    }

    pub(crate) const fn status_handle(&self) -> &Arc<watch::Sender<SyncStatus>> {
        &self.status
    }

    /// Whether a sync cycle currently holds this queue
    pub fn is_syncing(&self) -> bool {
        self.sync_in_flight.load(Ordering::Acquire)
    }

    pub(crate) const fn sync_flag(&self) -> &AtomicBool {
        &self.sync_in_flight
    }

    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: QueueStore> OfflineQueue<S> {
    /// Open the queue over `store`, publishing counts for what is already persisted
    pub async fn open(store: S) -> Self {
        let items = store.load().await;
        let mut status = SyncStatus::default();
        status.recount(&items);
        status.last_sync_at = store.load_last_sync_at().await;
        if !items.is_empty() {
            tracing::info!(
                "Loaded offline queue: {} pending, {} conflicts, {} failed",
                status.pending,
                status.conflicts,
                status.failed
            );
        }

        let (status, _) = watch::channel(status);
        Self {
            store,
            write_lock: Mutex::new(()),
            sync_in_flight: AtomicBool::new(false),
            status: Arc::new(status),
        }
    }

    /// Record a mutation for later sync and return its offline id.
    ///
    /// Never touches the network. Once this returns `Ok`, the mutation is
    /// persisted and stays visible until it is synced, failed, or discarded.
    pub async fn enqueue(&self, mutation: Mutation) -> Result<OfflineId> {
        if mutation.entity.trim().is_empty() {
            return Err(Error::InvalidInput("entity cannot be empty".to_string()));
        }

        let item = QueueItem::from_mutation(mutation, unix_millis_now());
        let offline_id = item.offline_id.clone();
        let (entity, op) = (item.entity.clone(), item.op);

        self.modify(move |items| {
            items.push(item);
            Ok(())
        })
        .await?;

        tracing::debug!("Enqueued {} {} as {}", op, entity, offline_id);
        Ok(offline_id)
    }

    /// Full snapshot in insertion order
    pub async fn items(&self) -> Vec<QueueItem> {
        self.store.load().await
    }

    pub async fn get(&self, offline_id: &OfflineId) -> Option<QueueItem> {
        self.store
            .load()
            .await
            .into_iter()
            .find(|item| item.offline_id == *offline_id)
    }

    pub async fn list_by_status(&self, status: QueueStatus) -> Vec<QueueItem> {
        self.store
            .load()
            .await
            .into_iter()
            .filter(|item| item.status == status)
            .collect()
    }

    /// Items waiting for a user decision
    pub async fn list_conflicts(&self) -> Vec<QueueItem> {
        self.list_by_status(QueueStatus::Conflict).await
    }

    /// Drop an item regardless of its status
    pub async fn discard(&self, offline_id: &OfflineId) -> Result<QueueItem> {
        let removed = self
            .modify(|items| {
                let index = items
                    .iter()
                    .position(|item| item.offline_id == *offline_id)
                    .ok_or_else(|| Error::NotFound(offline_id.clone()))?;
                Ok(items.remove(index))
            })
            .await?;

        tracing::info!("Discarded {} item {}", removed.status, removed.offline_id);
        Ok(removed)
    }

    /// Resubmit a failed item for the next cycle
    pub async fn retry_failed(&self, offline_id: &OfflineId) -> Result<QueueItem> {
        let now = unix_millis_now();
        self.modify(|items| {
            let item = items
                .iter_mut()
                .find(|item| item.offline_id == *offline_id)
                .ok_or_else(|| Error::NotFound(offline_id.clone()))?;
            if item.status != QueueStatus::Failed {
                return Err(Error::NotFailed(offline_id.clone()));
            }

            item.status = QueueStatus::Pending;
            item.attempts = 0;
            item.error = None;
            item.updated_at = now;
            Ok(item.clone())
        })
        .await
    }

    /// Load, mutate, and persist the snapshot under the write lock.
    ///
    /// Nothing is saved when `apply` returns an error, or when the current
    /// snapshot cannot be read: writing over an unread snapshot would lose it.
    pub(crate) async fn modify<R, F>(&self, apply: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<QueueItem>) -> Result<R> + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut items = self.store.try_load().await?;
        let result = apply(&mut items)?;
        self.store.save(&items).await?;
        self.status.send_modify(|status| status.recount(&items));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::{LibSqlQueueStore, MemoryQueueStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    async fn memory_queue() -> OfflineQueue<MemoryQueueStore> {
        OfflineQueue::open(MemoryQueueStore::new()).await
    }

    #[tokio::test]
    async fn enqueue_many_while_offline_keeps_every_item() {
        let queue = memory_queue().await;

        let mut ids = Vec::new();
        for index in 0..25 {
            ids.push(
                queue
                    .enqueue(Mutation::create("incident", json!({ "n": index })))
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(queue.status().pending, 25);
        let stored: Vec<OfflineId> = queue
            .items()
            .await
            .into_iter()
            .map(|item| item.offline_id)
            .collect();
        assert_eq!(stored, ids);
    }

    #[tokio::test]
    async fn enqueue_rejects_blank_entity() {
        let queue = memory_queue().await;
        let error = queue
            .enqueue(Mutation::create("  ", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(queue.items().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_persists_before_returning() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let queue = OfflineQueue::open(LibSqlQueueStore::new(Arc::clone(&db))).await;
        let offline_id = queue
            .enqueue(Mutation::create("permit", json!({"title": "A"})))
            .await
            .unwrap();

        let reopened = OfflineQueue::open(LibSqlQueueStore::new(db)).await;
        let item = reopened.get(&offline_id).await.unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(reopened.status().pending, 1);
    }

    #[tokio::test]
    async fn discard_removes_item_of_any_status() {
        let queue = memory_queue().await;
        let offline_id = queue
            .enqueue(Mutation::delete("worker", json!({})).with_server_id(9_i64))
            .await
            .unwrap();

        let removed = queue.discard(&offline_id).await.unwrap();
        assert_eq!(removed.offline_id, offline_id);
        assert!(queue.items().await.is_empty());
        assert_eq!(queue.status().pending, 0);

        assert!(matches!(
            queue.discard(&offline_id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn retry_failed_requeues_only_failed_items() {
        let mut failed = QueueItem::from_mutation(Mutation::create("permit", json!({})), 0);
        failed.status = QueueStatus::Failed;
        failed.attempts = 2;
        failed.error = Some("permit no longer exists".to_string());
        let failed_id = failed.offline_id.clone();
        let pending = QueueItem::from_mutation(Mutation::create("permit", json!({})), 0);
        let pending_id = pending.offline_id.clone();

        let queue = OfflineQueue::open(MemoryQueueStore::with_items(vec![failed, pending])).await;
        assert_eq!(queue.status().failed, 1);

        let retried = queue.retry_failed(&failed_id).await.unwrap();
        assert_eq!(retried.status, QueueStatus::Pending);
        assert_eq!(retried.attempts, 0);
        assert_eq!(retried.error, None);
        assert_eq!(queue.status().pending, 2);

        assert!(matches!(
            queue.retry_failed(&pending_id).await,
            Err(Error::NotFailed(_))
        ));
    }

    #[tokio::test]
    async fn subscribers_see_enqueue_transitions() {
        let queue = memory_queue().await;
        let mut receiver = queue.subscribe();

        queue
            .enqueue(Mutation::create("photo", json!({"uri": "file://a.jpg"})))
            .await
            .unwrap();

        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().pending, 1);
    }
}
