//! Stable per-install device identity.

use crate::db::LocalStateRepository;
use crate::models::DeviceId;
use crate::Result;

const DEVICE_ID_KEY: &str = "device_id";

/// Read the persisted device id, generating and persisting one on first use.
///
/// Repeated calls, including across restarts, return the same id.
pub async fn get_or_create_device_id(repo: &impl LocalStateRepository) -> Result<DeviceId> {
    if let Some(existing) = repo.get(DEVICE_ID_KEY).await? {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(DeviceId::from_persisted(existing));
        }
        tracing::warn!("Persisted device id is blank; generating a new one");
    }

    let device_id = DeviceId::generate();
    repo.set(DEVICE_ID_KEY, device_id.as_str()).await?;
    tracing::info!("Generated device id {}", device_id);
    Ok(device_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlLocalStateRepository};
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_device_id_is_idempotent_within_process() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlLocalStateRepository::new(db.connection());

        let first = get_or_create_device_id(&repo).await.unwrap();
        let second = get_or_create_device_id(&repo).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_device_id_survives_restart() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("state.db");

        let first = {
            let db = Database::open(&db_path).await.unwrap();
            get_or_create_device_id(&LibSqlLocalStateRepository::new(db.connection()))
                .await
                .unwrap()
        };

        let db = Database::open(&db_path).await.unwrap();
        let second = get_or_create_device_id(&LibSqlLocalStateRepository::new(db.connection()))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blank_device_id_is_replaced() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlLocalStateRepository::new(db.connection());
        repo.set(DEVICE_ID_KEY, "   ").await.unwrap();

        let device_id = get_or_create_device_id(&repo).await.unwrap();
        assert!(device_id.as_str().starts_with("dev_"));
        assert_eq!(
            repo.get(DEVICE_ID_KEY).await.unwrap().as_deref(),
            Some(device_id.as_str())
        );
    }
}
