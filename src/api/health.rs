//! Shared health state for the /health endpoint.
//! Updated by the refresher, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// True when the last refresh tick completed without a feed or DB error.
    pub last_refresh_ok: AtomicBool,
    /// Millisecond timestamp of the last completed refresh (0 = none yet).
    pub last_refresh_at_ms: AtomicU64,
    /// Completed refresh ticks since startup.
    pub refresh_count: AtomicU64,
    /// Failed feed requests during the last refresh.
    pub last_failed_requests: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh(&self, at_ms: u64, failed_requests: u64) {
        self.last_refresh_ok.store(failed_requests == 0, Ordering::Relaxed);
        self.last_refresh_at_ms.store(at_ms, Ordering::Relaxed);
        self.last_failed_requests.store(failed_requests, Ordering::Relaxed);
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_error(&self) {
        self.last_refresh_ok.store(false, Ordering::Relaxed);
    }

    pub fn last_refresh_ok(&self) -> bool {
        self.last_refresh_ok.load(Ordering::Relaxed)
    }

    pub fn last_refresh_at_ms(&self) -> u64 {
        self.last_refresh_at_ms.load(Ordering::Relaxed)
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    pub fn last_failed_requests(&self) -> u64 {
        self.last_failed_requests.load(Ordering::Relaxed)
    }
}
