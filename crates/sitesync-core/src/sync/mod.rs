//! Offline queue synchronization.
//!
//! [`OfflineQueue`] owns local bookkeeping (enqueue, resolve, discard, retry,
//! prune) and works without a network. [`SyncEngine`] adds the exchange with
//! the server over a [`SyncTransport`]; [`run_auto_sync`] drives it from
//! connectivity transitions and a fixed interval.

mod connectivity;
mod driver;
mod gc;
mod orchestrator;
mod probe;
mod queue;
mod resolver;
mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use connectivity::{Connectivity, ConnectivityMonitor};
pub use driver::run_auto_sync;
pub use gc::prune_synced;
pub use orchestrator::{CycleReport, SkipReason, SyncEngine, SyncOutcome};
pub use probe::ReachabilityProbe;
pub use queue::OfflineQueue;
pub use resolver::{apply_resolution, ConflictStrategy, Resolution};
pub use transport::{
    HttpSyncTransport, SyncTransport, TransportConfig, TransportError, TransportResult,
};
