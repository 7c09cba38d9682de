use std::time::Duration;
use tracing::debug;

/// Background re-fetch of the allowlist with a stale-response guard.
///
/// Every fetch gets a sequence number from [`issue`](Self::issue). A
/// response is applied only if its number is greater than the last applied
/// one, so a slow response can never overwrite a fresher one.
#[derive(Debug)]
pub struct PollingRefresher {
    interval: Duration,
    issued: u64,
    applied: u64,
}

impl PollingRefresher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            issued: 0,
            applied: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polling runs only while the console is visible and signed in.
    pub fn should_poll(&self, visible: bool, authenticated: bool) -> bool {
        visible && authenticated
    }

    /// Tag a new fetch.
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Record that the response for `seq` arrived. Returns false when it
    /// is stale and must be dropped.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied {
            debug!(seq, applied = self.applied, "Dropping stale list response");
            return false;
        }
        self.applied = seq;
        true
    }

    pub fn is_stale(&self, seq: u64) -> bool {
        seq <= self.applied
    }

    /// Drop every fetch issued so far. Used after a local patch, which is
    /// fresher than anything still in flight.
    pub fn supersede(&mut self) {
        self.applied = self.issued;
    }

    pub fn in_flight(&self) -> u64 {
        self.issued - self.applied
    }
}
