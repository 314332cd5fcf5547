//! Lock-free poll metrics and periodic reporting
//!
//! Uses atomics so the controller task never contends with the reporter.
//! Totals are monotonic; the latency histogram is a window that `report()`
//! swaps back to zero.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only. Do NOT use them for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Round-trip latency bucket boundaries (milliseconds)
/// Buckets: ≤25, ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, >12800
const BUCKET_BOUNDS: [u64; 10] = [25, 50, 100, 200, 400, 800, 1600, 3200, 6400, 12800];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64) * percentile).ceil() as u64;
    let mut cumulative = 0u64;
    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return if i < BUCKET_BOUNDS.len() { BUCKET_BOUNDS[i] } else { BUCKET_BOUNDS[9] * 2 };
        }
    }
    BUCKET_BOUNDS[9] * 2
}

/// Poll client metrics
pub struct Metrics {
    started_at: Instant,
    cycles_total: AtomicU64,
    cycles_failed: AtomicU64,
    incidents_received: AtomicU64,
    resyncs_total: AtomicU64,
    resyncs_failed: AtomicU64,
    last_latency_ms: AtomicU64,
    // Window values, reset by report()
    window_latency_sum_ms: AtomicU64,
    window_latency_max_ms: AtomicU64,
    window_latency_buckets: [AtomicU64; NUM_BUCKETS],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            cycles_total: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            incidents_received: AtomicU64::new(0),
            resyncs_total: AtomicU64::new(0),
            resyncs_failed: AtomicU64::new(0),
            last_latency_ms: AtomicU64::new(0),
            window_latency_sum_ms: AtomicU64::new(0),
            window_latency_max_ms: AtomicU64::new(0),
            window_latency_buckets: Default::default(),
        }
    }

    /// Record a completed `/simulate` round-trip
    #[inline]
    pub fn record_cycle(&self, latency_ms: u64) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.last_latency_ms.store(latency_ms, Ordering::Relaxed);
        self.window_latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        update_atomic_max(&self.window_latency_max_ms, latency_ms);
        self.window_latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cycle_failure(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_incident(&self) {
        self.incidents_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_resync(&self, ok: bool) {
        self.resyncs_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.resyncs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cycles_total(&self) -> u64 {
        self.cycles_total.load(Ordering::Relaxed)
    }

    pub fn cycles_failed(&self) -> u64 {
        self.cycles_failed.load(Ordering::Relaxed)
    }

    /// Snapshot totals and drain the latency window
    pub fn report(&self) -> MetricsSummary {
        let buckets = swap_buckets(&self.window_latency_buckets);
        let window_cycles: u64 = buckets.iter().sum();
        let latency_sum = self.window_latency_sum_ms.swap(0, Ordering::Relaxed);
        let latency_max = self.window_latency_max_ms.swap(0, Ordering::Relaxed);

        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            cycles_total: self.cycles_total.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            incidents_received: self.incidents_received.load(Ordering::Relaxed),
            resyncs_total: self.resyncs_total.load(Ordering::Relaxed),
            resyncs_failed: self.resyncs_failed.load(Ordering::Relaxed),
            last_latency_ms: self.last_latency_ms.load(Ordering::Relaxed),
            window_cycles,
            avg_latency_ms: if window_cycles > 0 { latency_sum / window_cycles } else { 0 },
            max_latency_ms: latency_max,
            p99_latency_ms: percentile_from_buckets(&buckets, 0.99),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub cycles_total: u64,
    pub cycles_failed: u64,
    pub incidents_received: u64,
    pub resyncs_total: u64,
    pub resyncs_failed: u64,
    pub last_latency_ms: u64,
    pub window_cycles: u64,
    pub avg_latency_ms: u64,
    pub max_latency_ms: u64,
    pub p99_latency_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            cycles_total = %self.cycles_total,
            cycles_failed = %self.cycles_failed,
            incidents_received = %self.incidents_received,
            resyncs_total = %self.resyncs_total,
            resyncs_failed = %self.resyncs_failed,
            window_cycles = %self.window_cycles,
            avg_latency_ms = %self.avg_latency_ms,
            max_latency_ms = %self.max_latency_ms,
            p99_latency_ms = %self.p99_latency_ms,
            "metrics_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(25), 0);
        assert_eq!(bucket_index(26), 1);
        assert_eq!(bucket_index(12800), 9);
        assert_eq!(bucket_index(50_000), 10);
    }

    #[test]
    fn test_report_drains_window_but_keeps_totals() {
        let metrics = Metrics::new();
        metrics.record_cycle(100);
        metrics.record_cycle(300);
        metrics.record_cycle_failure();
        metrics.record_incident();

        let first = metrics.report();
        assert_eq!(first.cycles_total, 2);
        assert_eq!(first.cycles_failed, 1);
        assert_eq!(first.incidents_received, 1);
        assert_eq!(first.window_cycles, 2);
        assert_eq!(first.avg_latency_ms, 200);
        assert_eq!(first.max_latency_ms, 300);
        assert_eq!(first.last_latency_ms, 300);

        let second = metrics.report();
        assert_eq!(second.cycles_total, 2);
        assert_eq!(second.window_cycles, 0);
        assert_eq!(second.avg_latency_ms, 0);
        assert_eq!(second.p99_latency_ms, 0);
    }

    #[test]
    fn test_percentile_from_buckets() {
        let metrics = Metrics::new();
        for _ in 0..99 {
            metrics.record_cycle(20);
        }
        metrics.record_cycle(5000);
        let summary = metrics.report();
        assert_eq!(summary.p99_latency_ms, 25);
    }

    #[test]
    fn test_resync_counters() {
        let metrics = Metrics::new();
        metrics.record_resync(true);
        metrics.record_resync(false);
        let summary = metrics.report();
        assert_eq!(summary.resyncs_total, 2);
        assert_eq!(summary.resyncs_failed, 1);
    }
}
