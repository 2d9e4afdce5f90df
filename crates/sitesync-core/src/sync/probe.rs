//! HTTP reachability probe feeding a [`ConnectivityMonitor`].

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::connectivity::ConnectivityMonitor;
use super::transport::{normalize_endpoint, TransportResult};

const PROBE_TIMEOUT_SECS: u64 = 5;

/// Periodically checks that the sync server answers at all.
///
/// Any HTTP response counts as reachable, including error statuses.
#[derive(Clone, Debug)]
pub struct ReachabilityProbe {
    client: reqwest::Client,
    target: String,
    interval: Duration,
}

impl ReachabilityProbe {
    pub fn new(target: impl Into<String>, interval: Duration) -> TransportResult<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
                .build()?,
            target: normalize_endpoint(target.into())?,
            interval,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn check(&self) -> bool {
        match self.client.head(&self.target).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Reachability check failed for {}: {}", self.target, error);
                false
            }
        }
    }

    /// Report reachability to `monitor` until `shutdown` flips to `true`.
    pub async fn run(&self, monitor: ConnectivityMonitor, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    monitor.set_online(self.check().await);
                }
            }
        }
    }
}
