//! Observable engine state shared with UIs and the CLI.

use serde::Serialize;

use crate::models::{QueueItem, QueueStatus};

/// Phase of the current sync cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Collecting,
    InFlight,
    Reconciling,
}

/// Snapshot published on every queue or cycle transition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub pending: usize,
    pub conflicts: usize,
    pub failed: usize,
    pub synced: usize,
    pub phase: SyncPhase,
    pub in_flight: bool,
    pub online: bool,
    /// Completion time of the last successful cycle (Unix ms)
    pub last_sync_at: Option<i64>,
}

impl SyncStatus {
    /// Recount per-status totals from a queue snapshot
    pub fn recount(&mut self, items: &[QueueItem]) {
        self.pending = 0;
        self.conflicts = 0;
        self.failed = 0;
        self.synced = 0;
        for item in items {
            match item.status {
                QueueStatus::Pending => self.pending += 1,
                QueueStatus::Conflict => self.conflicts += 1,
                QueueStatus::Failed => self.failed += 1,
                QueueStatus::Synced => self.synced += 1,
            }
        }
    }

    pub fn set_phase(&mut self, phase: SyncPhase) {
        self.phase = phase;
        self.in_flight = phase != SyncPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mutation;
    use serde_json::json;

    #[test]
    fn recount_tallies_each_status() {
        let mut items: Vec<QueueItem> = (0..4)
            .map(|_| QueueItem::from_mutation(Mutation::create("permit", json!({})), 0))
            .collect();
        items[1].status = QueueStatus::Conflict;
        items[2].status = QueueStatus::Failed;
        items[3].status = QueueStatus::Synced;

        let mut status = SyncStatus::default();
        status.recount(&items);
        assert_eq!(
            (status.pending, status.conflicts, status.failed, status.synced),
            (1, 1, 1, 1)
        );
    }

    #[test]
    fn set_phase_tracks_in_flight() {
        let mut status = SyncStatus::default();
        status.set_phase(SyncPhase::InFlight);
        assert!(status.in_flight);
        status.set_phase(SyncPhase::Idle);
        assert!(!status.in_flight);
    }
}
