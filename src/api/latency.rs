//! In-memory latency histogram for price-feed requests.
//! The feed client records, the API reads.

use std::sync::Mutex;
use std::time::Duration;

/// Shared latency stats. Values stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl LatencyStats {
    /// Create a new histogram. Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record_us(&self, us: u64) {
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us.max(1));
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.record_us(us);
    }

    /// Return (p50_us, p95_us, p99_us). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(h) = self.inner.lock() else {
            return (None, None, None);
        };
        if h.len() == 0 {
            return (None, None, None);
        }
        (
            Some(h.value_at_quantile(0.5)),
            Some(h.value_at_quantile(0.95)),
            Some(h.value_at_quantile(0.99)),
        )
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let stats = LatencyStats::new();
        assert_eq!(stats.len(), 0);
        assert_eq!(stats.percentiles(), (None, None, None));
    }

    #[test]
    fn percentiles_track_recorded_durations() {
        let stats = LatencyStats::new();
        for ms in 1..=100u64 {
            stats.record(Duration::from_millis(ms));
        }
        assert_eq!(stats.len(), 100);
        let (p50, p95, p99) = stats.percentiles();
        let p50 = p50.unwrap();
        let p99 = p99.unwrap();
        assert!((49_000..=51_000).contains(&p50), "p50={p50}");
        assert!(p95.unwrap() <= p99);
        assert!(p99 >= 98_000, "p99={p99}");
    }
}
