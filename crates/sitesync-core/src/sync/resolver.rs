//! Conflict resolution.
//!
//! Resolving is a local state transition only. `KeepLocal` and `Merge` put the
//! item back in the queue rebased onto the server's version; the next ordinary
//! sync cycle sends it again.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::queue::OfflineQueue;
use crate::models::{OfflineId, QueueItem, QueueStatus};
use crate::store::QueueStore;
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// Strategy names accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    UseRemote,
    KeepLocal,
    Merge,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UseRemote => "use_remote",
            Self::KeepLocal => "keep_local",
            Self::Merge => "merge",
        })
    }
}

impl FromStr for ConflictStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "use_remote" | "remote" => Ok(Self::UseRemote),
            "keep_local" | "local" => Ok(Self::KeepLocal),
            "merge" => Ok(Self::Merge),
            other => Err(Error::InvalidInput(format!(
                "unknown conflict strategy: {other}"
            ))),
        }
    }
}

/// A caller's decision for one conflicted item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Accept the server's state as final
    UseRemote,
    /// Resend the local payload against the server's current version
    KeepLocal,
    /// Resend a caller-merged payload against the server's current version
    Merge(Value),
}

impl Resolution {
    /// Build a resolution from a strategy name and an optional merged payload.
    ///
    /// `Merge` requires a payload; the other strategies ignore it.
    pub fn from_strategy(strategy: ConflictStrategy, merged: Option<Value>) -> Result<Self> {
        match (strategy, merged) {
            (ConflictStrategy::UseRemote, _) => Ok(Self::UseRemote),
            (ConflictStrategy::KeepLocal, _) => Ok(Self::KeepLocal),
            (ConflictStrategy::Merge, Some(payload)) => Ok(Self::Merge(payload)),
            (ConflictStrategy::Merge, None) => Err(Error::InvalidInput(
                "merge resolution requires a merged payload".to_string(),
            )),
        }
    }

    pub const fn strategy(&self) -> ConflictStrategy {
        match self {
            Self::UseRemote => ConflictStrategy::UseRemote,
            Self::KeepLocal => ConflictStrategy::KeepLocal,
            Self::Merge(_) => ConflictStrategy::Merge,
        }
    }
}

/// Apply `resolution` to a conflicted item.
///
/// Leaves the item untouched and returns `NotInConflict` when it has no
/// stored conflict.
pub fn apply_resolution(item: &mut QueueItem, resolution: Resolution, now: i64) -> Result<()> {
    if item.status != QueueStatus::Conflict {
        return Err(Error::NotInConflict(item.offline_id.clone()));
    }
    let Some(conflict) = item.conflict.take() else {
        return Err(Error::NotInConflict(item.offline_id.clone()));
    };

    if !item.adopt_server_id(conflict.server_id.clone()) {
        tracing::warn!(
            "Conflict for {} names server id {} but item is bound to {:?}; keeping existing id",
            item.offline_id,
            conflict.server_id,
            item.server_id
        );
    }
    item.client_version = Some(conflict.server_version);
    item.updated_at = now;
    item.error = None;

    match resolution {
        Resolution::UseRemote => {
            item.payload = conflict.server_data;
            item.status = QueueStatus::Synced;
        }
        Resolution::KeepLocal => {
            item.status = QueueStatus::Pending;
            item.attempts = 0;
        }
        Resolution::Merge(merged) => {
            item.payload = merged;
            item.status = QueueStatus::Pending;
            item.attempts = 0;
        }
    }
    Ok(())
}

impl<S: QueueStore> OfflineQueue<S> {
    /// Resolve a conflicted item and persist the result
    pub async fn resolve_conflict(
        &self,
        offline_id: &OfflineId,
        resolution: Resolution,
    ) -> Result<QueueItem> {
        let strategy = resolution.strategy();
        let now = unix_millis_now();
        let resolved = self
            .modify(|items| {
                let item = items
                    .iter_mut()
                    .find(|item| item.offline_id == *offline_id)
                    .ok_or_else(|| Error::NotFound(offline_id.clone()))?;
                apply_resolution(item, resolution, now)?;
                Ok(item.clone())
            })
            .await?;

        tracing::info!(
            "Resolved conflict for {} with {} (now {})",
            offline_id,
            strategy,
            resolved.status
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictRecord, Mutation, ServerId};
    use crate::store::MemoryQueueStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn conflicted(server_version: i64) -> QueueItem {
        let mut item = QueueItem::from_mutation(
            Mutation::update("permit", json!({"title": "local"}))
                .with_server_id(501_i64)
                .with_client_version(3),
            0,
        );
        item.status = QueueStatus::Conflict;
        item.attempts = 2;
        item.conflict = Some(ConflictRecord {
            server_id: ServerId::Number(501),
            server_version,
            server_data: json!({"title": "remote"}),
            local_data: json!({"title": "local"}),
        });
        item
    }

    #[test]
    fn keep_local_rebases_onto_server_version() {
        let mut item = conflicted(7);
        apply_resolution(&mut item, Resolution::KeepLocal, 10).unwrap();

        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.client_version, Some(7));
        assert_eq!(item.conflict, None);
        assert_eq!(item.attempts, 0);
        assert_eq!(item.payload, json!({"title": "local"}));
    }

    #[test]
    fn merge_replaces_payload_then_requeues() {
        let mut item = conflicted(4);
        apply_resolution(
            &mut item,
            Resolution::Merge(json!({"title": "local + remote"})),
            10,
        )
        .unwrap();

        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.client_version, Some(4));
        assert_eq!(item.payload, json!({"title": "local + remote"}));
    }

    #[test]
    fn use_remote_finalizes_with_server_state() {
        let mut item = conflicted(9);
        apply_resolution(&mut item, Resolution::UseRemote, 10).unwrap();

        assert_eq!(item.status, QueueStatus::Synced);
        assert_eq!(item.server_id, Some(ServerId::Number(501)));
        assert_eq!(item.client_version, Some(9));
        assert_eq!(item.payload, json!({"title": "remote"}));
        assert_eq!(item.conflict, None);
    }

    #[test]
    fn resolving_non_conflicted_item_changes_nothing() {
        let mut item = QueueItem::from_mutation(Mutation::create("permit", json!({})), 0);
        let before = item.clone();

        let error = apply_resolution(&mut item, Resolution::KeepLocal, 10).unwrap_err();
        assert!(matches!(error, Error::NotInConflict(_)));
        assert_eq!(item, before);
    }

    #[test]
    fn merge_strategy_requires_payload() {
        assert!(Resolution::from_strategy(ConflictStrategy::Merge, None).is_err());
        assert_eq!(
            Resolution::from_strategy(ConflictStrategy::KeepLocal, Some(json!({}))).unwrap(),
            Resolution::KeepLocal
        );
        assert_eq!(
            "use-remote".parse::<ConflictStrategy>().unwrap(),
            ConflictStrategy::UseRemote
        );
    }

    #[tokio::test]
    async fn second_use_remote_is_not_in_conflict() {
        let item = conflicted(7);
        let offline_id = item.offline_id.clone();
        let queue = OfflineQueue::open(MemoryQueueStore::with_items(vec![item])).await;

        queue
            .resolve_conflict(&offline_id, Resolution::UseRemote)
            .await
            .unwrap();
        let snapshot = queue.items().await;

        let error = queue
            .resolve_conflict(&offline_id, Resolution::UseRemote)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotInConflict(_)));
        assert_eq!(queue.items().await, snapshot);
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn resolve_unknown_item_is_not_found() {
        let queue = OfflineQueue::open(MemoryQueueStore::new()).await;
        let error = queue
            .resolve_conflict(&OfflineId::new(), Resolution::KeepLocal)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }
}
