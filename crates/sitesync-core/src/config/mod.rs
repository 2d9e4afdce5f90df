//! Engine configuration.
//!
//! Timings for the sync triggers, the transport timeout, and the retention
//! window used by GC. All values have defaults suitable for a field device.

use std::time::Duration;

const DEFAULT_SETTLE_DELAY_SECS: u64 = 2;
const DEFAULT_AUTO_SYNC_INTERVAL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Configuration for the sync engine and its auto-sync driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay after an offline→online transition before syncing
    pub settle_delay: Duration,
    /// Fixed interval for the periodic trigger (`None` disables it)
    pub auto_sync_interval: Option<Duration>,
    /// Upper bound for one sync exchange
    pub request_timeout: Duration,
    /// Age after which `synced` items are pruned
    pub retention: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_DELAY_SECS),
            auto_sync_interval: Some(Duration::from_secs(DEFAULT_AUTO_SYNC_INTERVAL_SECS)),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retention: Duration::from_secs(DEFAULT_RETENTION_DAYS * 24 * 60 * 60),
        }
    }
}

impl EngineConfig {
    /// Set the post-reconnect settling delay
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the periodic auto-sync interval
    #[must_use]
    pub const fn with_auto_sync_interval(mut self, interval: Duration) -> Self {
        self.auto_sync_interval = Some(interval);
        self
    }

    /// Disable the periodic trigger (connectivity and manual triggers only)
    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.auto_sync_interval = None;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Retention window in milliseconds, saturating on overflow
    pub fn retention_millis(&self) -> i64 {
        i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX)
    }
}
