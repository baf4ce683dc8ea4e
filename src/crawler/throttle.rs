//! Courtesy rate limiting for outbound requests
//!
//! Every request to the remote site, whatever its kind (login, page,
//! overflow payload, retry), waits here first so consecutive requests are
//! at least `min_interval` apart.

use std::time::{Duration, Instant};

/// Blocking delay between consecutive requests
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_request: Option<Instant>,
    requests: u64,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
            requests: 0,
        }
    }

    /// Time left before the next request may go out, or None if it may go now
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.min_interval {
            None
        } else {
            Some(self.min_interval - elapsed)
        }
    }

    /// Records that a request was sent at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.last_request = Some(now);
        self.requests += 1;
    }

    /// Waits until a request may be sent, then records it
    pub async fn wait(&mut self) {
        if let Some(delay) = self.time_until_next_request(Instant::now()) {
            tracing::trace!("Throttling for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
        self.record_request(Instant::now());
    }

    /// Number of requests sent through this throttle
    pub fn requests(&self) -> u64 {
        self.requests
    }
}
