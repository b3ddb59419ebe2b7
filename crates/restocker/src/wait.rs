//! Network-idle detection and settle delays.
//!
//! The portal renders client-side after its requests finish, so every
//! navigation step waits for the network to go quiet and then sleeps a short
//! settle delay. Both are heuristics: a page that never goes quiet is given
//! up on after a cap and the run continues.

use serde::Deserialize;
use std::time::{Duration, Instant};

/// Script sampling the page's load progress
pub const NETWORK_PROBE_JS: &str =
    "({ ready: document.readyState, resources: performance.getEntriesByType('resource').length })";

/// Polling interval while waiting for network idle
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One sample of [`NETWORK_PROBE_JS`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkProbe {
    /// `document.readyState`
    pub ready: String,
    /// Resource timing entries seen so far
    pub resources: usize,
}

impl NetworkProbe {
    /// Whether the document finished loading
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.ready == "complete"
    }
}

/// Decides network idle from successive probes: the document is complete
/// and no new resource was fetched for `quiet`.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    quiet: Duration,
    last_count: Option<usize>,
    last_change: Instant,
}

impl IdleTracker {
    /// Tracker requiring `quiet` without new requests
    #[must_use]
    pub fn new(quiet: Duration, start: Instant) -> Self {
        Self {
            quiet,
            last_count: None,
            last_change: start,
        }
    }

    /// Feed a probe taken at `now`; returns true once idle
    pub fn observe(&mut self, probe: &NetworkProbe, now: Instant) -> bool {
        if self.last_count != Some(probe.resources) {
            self.last_count = Some(probe.resources);
            self.last_change = now;
        }
        probe.is_complete() && now.duration_since(self.last_change) >= self.quiet
    }
}

/// Sleep for a settle delay (no-op for zero)
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Milliseconds to a settle duration
#[must_use]
pub const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
