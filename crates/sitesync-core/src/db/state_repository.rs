//! Key/value repository for persisted local state

use crate::error::{Error, Result};
use crate::util::unix_millis_now;
use libsql::{Connection, Value};

/// Trait for whole-value local state storage (async)
#[allow(async_fn_in_trait)]
pub trait LocalStateRepository {
    /// Read the text stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key` in a single statement
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// libSQL implementation of `LocalStateRepository`
pub struct LibSqlLocalStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlLocalStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Read the stored value without assuming its SQLite type.
    ///
    /// `local_state.value` has TEXT affinity, which does not stop a blob or
    /// a number from being stored there.
    pub async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM local_state WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get_value(0)?)),
            None => Ok(None),
        }
    }

    /// Store `value` as-is, keeping its SQLite type
    pub async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO local_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
                libsql::params![key, value, unix_millis_now()],
            )
            .await?;
        Ok(())
    }
}

impl LocalStateRepository for LibSqlLocalStateRepository<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.get_value(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text)),
            Some(_) => Err(Error::Database(format!(
                "value stored under '{key}' is not text"
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::Text(value.to_string())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_key_reads_none() {
        let db = setup().await;
        let repo = LibSqlLocalStateRepository::new(db.connection());

        assert_eq!(repo.get("device_id").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_replaces_previous_value() {
        let db = setup().await;
        let repo = LibSqlLocalStateRepository::new(db.connection());

        repo.set("offline_queue", "[]").await.unwrap();
        repo.set("offline_queue", "[1]").await.unwrap();
        assert_eq!(
            repo.get("offline_queue").await.unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_text_value_is_an_error_not_a_panic() {
        let db = setup().await;
        let repo = LibSqlLocalStateRepository::new(db.connection());

        repo.set_value("device_id", Value::Blob(b"[]".to_vec()))
            .await
            .unwrap();

        assert!(matches!(
            repo.get("device_id").await,
            Err(Error::Database(_))
        ));
        assert_eq!(
            repo.get_value("device_id").await.unwrap(),
            Some(Value::Blob(b"[]".to_vec()))
        );
    }
}
