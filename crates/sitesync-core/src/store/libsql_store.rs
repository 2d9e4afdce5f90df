//! libSQL-backed queue store

use std::sync::Arc;

use async_trait::async_trait;
use libsql::Value;

use super::QueueStore;
use crate::db::{Database, LibSqlLocalStateRepository, LocalStateRepository};
use crate::models::QueueItem;
use crate::util::unix_millis_now;
use crate::{Error, Result};

const QUEUE_KEY: &str = "offline_queue";
const LAST_SYNC_KEY: &str = "last_sync_at";

/// Queue store keeping the snapshot as one JSON value in `local_state`
#[derive(Clone)]
pub struct LibSqlQueueStore {
    db: Arc<Database>,
}

impl LibSqlQueueStore {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Shared database handle, e.g. for device identity
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn repo(&self) -> LibSqlLocalStateRepository<'_> {
        LibSqlLocalStateRepository::new(self.db.connection())
    }

    /// Keep an unreadable snapshot under a side key so the next save does not
    /// destroy it.
    async fn quarantine_snapshot(&self, raw: Value) {
        let backup_key = format!("{QUEUE_KEY}.corrupt-{}", unix_millis_now());
        match self.repo().set_value(&backup_key, raw).await {
            Ok(()) => tracing::warn!("Moved unreadable queue snapshot to {}", backup_key),
            Err(error) => tracing::warn!("Failed to keep unreadable queue snapshot: {}", error),
        }
    }
}

#[async_trait]
impl QueueStore for LibSqlQueueStore {
    async fn try_load(&self) -> Result<Vec<QueueItem>> {
        let raw = match self
            .repo()
            .get_value(QUEUE_KEY)
            .await
            .map_err(|error| Error::Storage(format!("failed to read queue snapshot: {error}")))?
        {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Text(raw)) => raw,
            Some(other) => {
                tracing::warn!("Queue snapshot is not stored as text, treating as empty");
                self.quarantine_snapshot(other).await;
                return Ok(Vec::new());
            }
        };

        match serde_json::from_str::<Vec<QueueItem>>(&raw) {
            Ok(items) => Ok(items),
            Err(error) => {
                tracing::warn!("Queue snapshot is corrupted, treating as empty: {}", error);
                self.quarantine_snapshot(Value::Text(raw)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, items: &[QueueItem]) -> Result<()> {
        let serialized = serde_json::to_string(items)?;
        self.repo()
            .set(QUEUE_KEY, &serialized)
            .await
            .map_err(|error| Error::Storage(format!("failed to save queue snapshot: {error}")))
    }

    async fn load_last_sync_at(&self) -> Option<i64> {
        match self.repo().get(LAST_SYNC_KEY).await {
            Ok(value) => value.and_then(|value| value.trim().parse().ok()),
            Err(error) => {
                tracing::warn!("Failed to read last sync time: {}", error);
                None
            }
        }
    }

    async fn save_last_sync_at(&self, at: i64) -> Result<()> {
        self.repo().set(LAST_SYNC_KEY, &at.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mutation, QueueStatus};
    use crate::sync::OfflineQueue;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    async fn setup() -> LibSqlQueueStore {
        LibSqlQueueStore::new(Arc::new(Database::open_in_memory().await.unwrap()))
    }

    fn item(title: &str) -> QueueItem {
        QueueItem::from_mutation(Mutation::create("permit", json!({ "title": title })), 1)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_store_loads_nothing() {
        let store = setup().await;
        assert!(store.load().await.is_empty());
        assert_eq!(store.load_last_sync_at().await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_load_preserves_order() {
        let store = setup().await;
        let items = vec![item("A"), item("B"), item("C")];

        store.save(&items).await.unwrap();
        assert_eq!(store.load().await, items);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_corrupted_snapshot_fails_open_and_is_kept_aside() {
        let store = setup().await;
        store.repo().set(QUEUE_KEY, "{not json").await.unwrap();

        assert!(store.load().await.is_empty());

        let mut rows = store
            .database()
            .connection()
            .query(
                "SELECT value FROM local_state WHERE key LIKE 'offline_queue.corrupt-%'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let kept: String = row.get(0).unwrap();
        assert_eq!(kept, "{not json");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blob_snapshot_fails_open_and_is_kept_aside() {
        let store = setup().await;
        store
            .repo()
            .set_value(QUEUE_KEY, Value::Blob(b"[]".to_vec()))
            .await
            .unwrap();

        let queue = OfflineQueue::open(store.clone()).await;
        assert!(queue.items().await.is_empty());

        let mut rows = store
            .database()
            .connection()
            .query(
                "SELECT value FROM local_state WHERE key LIKE 'offline_queue.corrupt-%'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get_value(0).unwrap(), Value::Blob(b"[]".to_vec()));

        // The quarantined value no longer blocks writes.
        queue
            .enqueue(Mutation::create("permit", json!({ "title": "A" })))
            .await
            .unwrap();
        assert_eq!(store.load().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreadable_storage_aborts_writes_instead_of_overwriting() {
        let store = setup().await;
        let existing = vec![item("A"), item("B")];
        store.save(&existing).await.unwrap();
        let queue = OfflineQueue::open(store.clone()).await;

        store
            .database()
            .connection()
            .execute("ALTER TABLE local_state RENAME TO local_state_moved", ())
            .await
            .unwrap();

        assert!(store.try_load().await.is_err());
        assert!(store.load().await.is_empty());
        let result = queue
            .enqueue(Mutation::create("permit", json!({ "title": "C" })))
            .await;
        assert!(matches!(result, Err(Error::Storage(_))));

        store
            .database()
            .connection()
            .execute("ALTER TABLE local_state_moved RENAME TO local_state", ())
            .await
            .unwrap();
        assert_eq!(store.load().await, existing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_snapshot_survives_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("queue.db");
        let mut pending = item("A");
        pending.status = QueueStatus::Conflict;

        {
            let store = LibSqlQueueStore::new(Arc::new(Database::open(&db_path).await.unwrap()));
            store.save(std::slice::from_ref(&pending)).await.unwrap();
            store.save_last_sync_at(42).await.unwrap();
        }

        let store = LibSqlQueueStore::new(Arc::new(Database::open(&db_path).await.unwrap()));
        assert_eq!(store.load().await, vec![pending]);
        assert_eq!(store.load_last_sync_at().await, Some(42));
    }
}
