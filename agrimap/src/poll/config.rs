//! Configuration for the result poller.

use std::time::Duration;

/// Default interval between polls (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default ceiling on a session's lifetime (seconds).
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 180;

/// Shortest interval a session will tick at; smaller values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timing of a [`ResultPoller`](super::ResultPoller) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between fetches; the first fetch happens one interval after start
    pub interval: Duration,

    /// Total session lifetime, measured from start
    pub timeout: Duration,
}

impl PollerConfig {
    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs).max(MIN_POLL_INTERVAL),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from_secs(DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS)
    }
}
