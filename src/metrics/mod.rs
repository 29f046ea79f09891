//! Pool-wide observability: hit/miss/eviction counters and a fetch-latency
//! histogram. Purely a side channel — nothing here ever influences the
//! buffer pool's control flow, so a caller can ignore this module entirely.

use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct PoolMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    fetch_latency: Mutex<Histogram<u64>>,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            // 1ns to 10s, two significant figures of precision. Plenty for a
            // pool that never blocks on anything slower than disk.
            fetch_latency: Mutex::new(Histogram::new_with_bounds(1, 10_000_000_000, 2).unwrap()),
        }
    }

    pub fn record_hit(&self, elapsed: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.record_latency(elapsed);
    }

    pub fn record_miss(&self, elapsed: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.record_latency(elapsed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, elapsed: Duration) {
        let nanos = elapsed.as_nanos().min(u128::from(u64::MAX)) as u64;
        if let Ok(mut hist) = self.fetch_latency.lock() {
            // Saturating: a value above the configured bound is clamped
            // rather than dropped, so a pathological stall still shows up in
            // the max rather than vanishing from the histogram.
            let _ = hist.record(nanos.max(1));
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    pub fn fetch_latency_p99(&self) -> Duration {
        let hist = self.fetch_latency.lock().unwrap();
        Duration::from_nanos(hist.value_at_quantile(0.99))
    }
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_reflects_recorded_calls() {
        let metrics = PoolMetrics::new();
        metrics.record_hit(Duration::from_micros(1));
        metrics.record_hit(Duration::from_micros(1));
        metrics.record_miss(Duration::from_micros(1));

        assert_eq!(metrics.hits(), 2);
        assert_eq!(metrics.misses(), 1);
        assert!((metrics.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn eviction_counter_is_independent_of_hit_miss() {
        let metrics = PoolMetrics::new();
        metrics.record_eviction();
        metrics.record_eviction();
        assert_eq!(metrics.evictions(), 2);
        assert_eq!(metrics.hits(), 0);
    }

    #[test]
    fn empty_histogram_reports_zero_p99() {
        let metrics = PoolMetrics::new();
        assert_eq!(metrics.fetch_latency_p99(), Duration::from_nanos(0));
    }
}
