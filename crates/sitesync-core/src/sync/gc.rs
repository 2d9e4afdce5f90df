//! Retention GC for finalized items.

use std::time::Duration;

use super::queue::OfflineQueue;
use crate::models::{QueueItem, QueueStatus};
use crate::store::QueueStore;
use crate::util::unix_millis_now;
use crate::Result;

/// Drop `synced` items older than `retention_ms`. Returns how many were removed.
///
/// Pending, conflicted, and failed items are never touched.
pub fn prune_synced(items: &mut Vec<QueueItem>, now: i64, retention_ms: i64) -> usize {
    let before = items.len();
    items.retain(|item| {
        item.status != QueueStatus::Synced
            || now.saturating_sub(item.created_at) <= retention_ms
    });
    before - items.len()
}

impl<S: QueueStore> OfflineQueue<S> {
    /// Run retention GC outside a sync cycle
    pub async fn prune_synced(&self, retention: Duration) -> Result<usize> {
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        let now = unix_millis_now();
        let pruned = self
            .modify(|items| Ok(prune_synced(items, now, retention_ms)))
            .await?;
        if pruned > 0 {
            tracing::debug!("Pruned {} synced items", pruned);
        }
        Ok(pruned)
    }
}
