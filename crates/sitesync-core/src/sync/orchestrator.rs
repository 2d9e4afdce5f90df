//! Sync cycle orchestration.
//!
//! A cycle moves `Idle → Collecting → InFlight → Reconciling → Idle`. At most
//! one cycle runs per queue, even with several engines over it; the queue's
//! in-flight flag is taken before any queue read and released by
//! [`CycleGuard`] on every exit path.
//!
//! A failed or timed-out exchange leaves every queue item exactly as it was.
//! Only a response from the server is allowed to change item state.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;

use super::connectivity::ConnectivityMonitor;
use super::gc::prune_synced;
use super::queue::OfflineQueue;
use super::resolver::Resolution;
use super::transport::{SyncTransport, TransportError};
use crate::config::EngineConfig;
use crate::models::{
    ChangeRecord, ConflictRecord, DeviceId, Mutation, OfflineId, QueueItem, QueueStatus, ServerId,
    SyncRequest, SyncResponse,
};
use crate::state::{SyncPhase, SyncStatus};
use crate::store::QueueStore;
use crate::util::unix_millis_now;
use crate::Result;

/// Why a cycle made no network call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    InFlight,
    NothingPending,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "offline",
            Self::InFlight => "a cycle is already in flight",
            Self::NothingPending => "nothing pending",
        })
    }
}

/// Per-cycle tallies
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub sent: usize,
    pub applied: usize,
    pub conflicts: usize,
    pub rejected: usize,
    /// Sent but left unclassified by the server
    pub deferred: usize,
    pub pruned: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped { reason: SkipReason },
    Completed(CycleReport),
    Aborted { reason: String },
}

impl SyncOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Owns the network side of the queue
pub struct SyncEngine<S, T> {
    queue: Arc<OfflineQueue<S>>,
    transport: T,
    device_id: DeviceId,
    connectivity: ConnectivityMonitor,
    config: EngineConfig,
}

impl<S: QueueStore, T: SyncTransport> SyncEngine<S, T> {
    pub fn new(
        queue: Arc<OfflineQueue<S>>,
        transport: T,
        device_id: DeviceId,
        connectivity: ConnectivityMonitor,
        config: EngineConfig,
    ) -> Self {
        connectivity.link_status(queue.status_handle());
        Self {
            queue,
            transport,
            device_id,
            connectivity,
            config,
        }
    }

    pub const fn queue(&self) -> &Arc<OfflineQueue<S>> {
        &self.queue
    }

    pub const fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn is_in_flight(&self) -> bool {
        self.queue.is_syncing()
    }

    /// Current status with live connectivity
    pub fn status(&self) -> SyncStatus {
        let mut status = self.queue.status();
        status.online = self.connectivity.is_online();
        status
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.queue.subscribe()
    }

    pub async fn enqueue(&self, mutation: Mutation) -> Result<OfflineId> {
        self.queue.enqueue(mutation).await
    }

    pub async fn resolve_conflict(
        &self,
        offline_id: &OfflineId,
        resolution: Resolution,
    ) -> Result<QueueItem> {
        self.queue.resolve_conflict(offline_id, resolution).await
    }

    pub async fn list_conflicts(&self) -> Vec<QueueItem> {
        self.queue.list_conflicts().await
    }

    pub async fn discard(&self, offline_id: &OfflineId) -> Result<QueueItem> {
        self.queue.discard(offline_id).await
    }

    pub async fn retry_failed(&self, offline_id: &OfflineId) -> Result<QueueItem> {
        self.queue.retry_failed(offline_id).await
    }

    /// Manual trigger
    pub async fn trigger_sync(&self) -> SyncOutcome {
        self.sync_now().await
    }

    /// Run one cycle unless offline, already running, or idle.
    pub async fn sync_now(&self) -> SyncOutcome {
        if !self.connectivity.is_online() {
            tracing::debug!("Sync skipped: offline");
            return SyncOutcome::Skipped {
                reason: SkipReason::Offline,
            };
        }

        let flag = self.queue.sync_flag();
        let Some(_guard) = CycleGuard::acquire(flag, self.queue.status_sender()) else {
            tracing::debug!("Sync skipped: a cycle is already in flight");
            return SyncOutcome::Skipped {
                reason: SkipReason::InFlight,
            };
        };

        self.queue
            .update_status(|status| status.set_phase(SyncPhase::Collecting));
        let pending: Vec<QueueItem> = self
            .queue
            .items()
            .await
            .into_iter()
            .filter(QueueItem::is_pending)
            .collect();
        if pending.is_empty() {
            tracing::debug!("Sync skipped: nothing pending");
            return SyncOutcome::Skipped {
                reason: SkipReason::NothingPending,
            };
        }

        let request = SyncRequest {
            device_id: self.device_id.clone(),
            client_time: Utc::now(),
            changes: pending.iter().map(ChangeRecord::from).collect(),
        };
        let sent: HashSet<OfflineId> = pending
            .into_iter()
            .map(|item| item.offline_id)
            .collect();

        self.queue
            .update_status(|status| status.set_phase(SyncPhase::InFlight));
        let timeout = self.config.request_timeout;
        let response =
            match tokio::time::timeout(timeout, self.transport.exchange(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(error)) => return Self::abort(&error, request.changes.len()),
                Err(_) => {
                    return Self::abort(&TransportError::Timeout(timeout), request.changes.len())
                }
            };

        self.queue
            .update_status(|status| status.set_phase(SyncPhase::Reconciling));
        let now = unix_millis_now();
        let retention_ms = self.config.retention_millis();
        let reconciled = self
            .queue
            .modify(move |items| {
                let mut report = reconcile(items, &sent, response, now);
                report.pruned = prune_synced(items, now, retention_ms);
                Ok(report)
            })
            .await;

        let report = match reconciled {
            Ok(report) => report,
            Err(error) => {
                tracing::error!("Failed to persist sync results: {}", error);
                return SyncOutcome::Aborted {
                    reason: error.to_string(),
                };
            }
        };

        if let Err(error) = self.queue.store().save_last_sync_at(now).await {
            tracing::warn!("Failed to persist last sync time: {}", error);
        }
        self.queue
            .update_status(|status| status.last_sync_at = Some(now));

        tracing::info!(
            "Sync cycle complete: {} sent, {} applied, {} conflicts, {} rejected, {} deferred, {} pruned",
            report.sent,
            report.applied,
            report.conflicts,
            report.rejected,
            report.deferred,
            report.pruned
        );
        SyncOutcome::Completed(report)
    }

    fn abort(error: &TransportError, batch: usize) -> SyncOutcome {
        tracing::warn!(
            "Sync exchange failed; {} items left untouched: {}",
            batch,
            error
        );
        SyncOutcome::Aborted {
            reason: error.to_string(),
        }
    }
}

/// Holds the single-flight flag for one cycle
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
    status: &'a watch::Sender<SyncStatus>,
}

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool, status: &'a watch::Sender<SyncStatus>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, status })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.status
            .send_modify(|status| status.set_phase(SyncPhase::Idle));
        self.flag.store(false, Ordering::Release);
    }
}

enum Classification {
    Applied {
        server_id: ServerId,
        new_version: i64,
    },
    Conflict(ConflictRecord),
    Rejected(String),
}

impl Classification {
    const fn bucket(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Conflict(_) => "conflicts",
            Self::Rejected(_) => "rejected",
        }
    }
}

fn classify(
    outcomes: &mut HashMap<OfflineId, Classification>,
    offline_id: OfflineId,
    classification: Classification,
) {
    match outcomes.entry(offline_id) {
        Entry::Vacant(entry) => {
            entry.insert(classification);
        }
        Entry::Occupied(entry) => {
            tracing::warn!(
                "Server listed {} in both {} and {}; keeping {}",
                entry.key(),
                entry.get().bucket(),
                classification.bucket(),
                entry.get().bucket()
            );
        }
    }
}

/// Apply a server response to the sent items that are still pending.
pub(crate) fn reconcile(
    items: &mut [QueueItem],
    sent: &HashSet<OfflineId>,
    response: SyncResponse,
    now: i64,
) -> CycleReport {
    let mut outcomes = HashMap::new();
    for applied in response.applied {
        classify(
            &mut outcomes,
            applied.offline_id,
            Classification::Applied {
                server_id: applied.server_id,
                new_version: applied.new_version,
            },
        );
    }
    for conflict in response.conflicts {
        let (offline_id, record) = conflict.into_record();
        classify(&mut outcomes, offline_id, Classification::Conflict(record));
    }
    for rejected in response.rejected {
        classify(
            &mut outcomes,
            rejected.offline_id,
            Classification::Rejected(rejected.reason),
        );
    }

    outcomes.retain(|offline_id, _| {
        let was_sent = sent.contains(offline_id);
        if !was_sent {
            tracing::debug!("Ignoring response entry for unsent item {}", offline_id);
        }
        was_sent
    });

    let mut report = CycleReport {
        sent: sent.len(),
        ..CycleReport::default()
    };
    for item in items
        .iter_mut()
        .filter(|item| item.is_pending() && sent.contains(&item.offline_id))
    {
        item.updated_at = now;
        match outcomes.remove(&item.offline_id) {
            Some(Classification::Applied {
                server_id,
                new_version,
            }) => {
                if !item.adopt_server_id(server_id.clone()) {
                    tracing::warn!(
                        "Server applied {} as {} but item is bound to {:?}; keeping existing id",
                        item.offline_id,
                        server_id,
                        item.server_id
                    );
                }
                item.client_version = Some(new_version);
                item.status = QueueStatus::Synced;
                item.conflict = None;
                item.error = None;
                report.applied += 1;
            }
            Some(Classification::Conflict(record)) => {
                item.status = QueueStatus::Conflict;
                item.conflict = Some(record);
                item.attempts = item.attempts.saturating_add(1);
                report.conflicts += 1;
            }
            Some(Classification::Rejected(reason)) => {
                tracing::warn!("Server rejected {}: {}", item.offline_id, reason);
                item.status = QueueStatus::Failed;
                item.error = Some(reason);
                item.attempts = item.attempts.saturating_add(1);
                report.rejected += 1;
            }
            None => {
                item.attempts = item.attempts.saturating_add(1);
                report.deferred += 1;
            }
        }
    }

    for offline_id in outcomes.keys() {
        tracing::debug!("Item {} changed locally during sync; response ignored", offline_id);
    }
    report
}
