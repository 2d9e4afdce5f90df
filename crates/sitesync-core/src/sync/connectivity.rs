//! Connectivity signal.
//!
//! The host platform (or [`super::ReachabilityProbe`]) reports reachability
//! here; the engine and auto-sync driver read and watch it.

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use tokio::sync::watch;

use crate::state::SyncStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    pub const fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// Shared, cloneable view of the current connectivity state.
///
/// Queue status channels linked with [`ConnectivityMonitor::link_status`]
/// have their `online` field kept in step with every report.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<Connectivity>>,
    linked: Arc<Mutex<Vec<Weak<watch::Sender<SyncStatus>>>>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            linked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mirror connectivity into a status channel, starting with the current value.
    pub(crate) fn link_status(&self, status: &Arc<watch::Sender<SyncStatus>>) {
        let online = self.is_online();
        status.send_if_modified(|current| {
            let changed = current.online != online;
            current.online = online;
            changed
        });

        if let Ok(mut linked) = self.linked.lock() {
            linked.retain(|existing| existing.strong_count() > 0);
            if !linked
                .iter()
                .any(|existing| existing.ptr_eq(&Arc::downgrade(status)))
            {
                linked.push(Arc::downgrade(status));
            }
        }
    }

    fn publish_to_linked(&self, online: bool) {
        let Ok(mut linked) = self.linked.lock() else {
            return;
        };
        linked.retain(|status| match status.upgrade() {
            Some(status) => {
                status.send_modify(|current| current.online = online);
                true
            }
            None => false,
        });
    }

    /// Report reachability. Watchers only wake on an actual transition.
    pub fn set_online(&self, online: bool) {
        let next = Connectivity::from_online(online);
        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            self.publish_to_linked(online);
            if online {
                tracing::info!("Connectivity restored");
            } else {
                tracing::info!("Connectivity lost");
            }
        }
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Offline)
    }
}
