//! Per-algorithm call counters and coarse latency histograms.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::adaptive::types::AlgorithmId;

/// Inclusive upper bounds (µs) of each histogram bucket.
const BUCKET_BOUNDS_US: [u64; 6] = [100, 500, 1_000, 5_000, 10_000, u64::MAX];
/// Value reported for a percentile landing in the matching bucket.
const BUCKET_REPRESENTATIVE_US: [f64; 6] = [50.0, 300.0, 750.0, 3_000.0, 7_500.0, 15_000.0];

#[derive(Default)]
struct LatencyHistogram {
    buckets: [AtomicU64; 6],
}

impl LatencyHistogram {
    fn observe(&self, latency_us: u64) {
        let slot = BUCKET_BOUNDS_US
            .iter()
            .position(|bound| latency_us <= *bound)
            .unwrap_or(BUCKET_BOUNDS_US.len() - 1);
        self.buckets[slot].fetch_add(1, Ordering::Relaxed);
    }

    fn quantile(&self, q: f64) -> f64 {
        let counts: Vec<u64> = self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect();
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let rank = (q * total as f64).ceil().max(1.0) as u64;
        let mut seen = 0;
        for (slot, count) in counts.iter().enumerate() {
            seen += count;
            if seen >= rank {
                return BUCKET_REPRESENTATIVE_US[slot];
            }
        }
        BUCKET_REPRESENTATIVE_US[BUCKET_REPRESENTATIVE_US.len() - 1]
    }

    fn clear(&self) {
        self.buckets.iter().for_each(|b| b.store(0, Ordering::Relaxed));
    }
}

#[derive(Default)]
pub struct AlgorithmCounters {
    calls: AtomicU64,
    errors: AtomicU64,
    latency_total_us: AtomicU64,
    last_call_ms: AtomicI64,
    latency: LatencyHistogram,
}

impl AlgorithmCounters {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Approximate (p50, p95, p99) latency in µs.
    pub fn percentiles(&self) -> (f64, f64, f64) {
        (
            self.latency.quantile(0.50),
            self.latency.quantile(0.95),
            self.latency.quantile(0.99),
        )
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let (p50_us, p95_us, p99_us) = self.percentiles();
        let last = self.last_call_ms.load(Ordering::Relaxed);
        MetricsSnapshot {
            call_count: self.calls(),
            total_latency_us: self.latency_total_us.load(Ordering::Relaxed),
            error_count: self.errors(),
            p50_us,
            p95_us,
            p99_us,
            last_called_at: (last > 0)
                .then(|| chrono::DateTime::from_timestamp_millis(last))
                .flatten()
                .map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub call_count: u64,
    pub total_latency_us: u64,
    pub error_count: u64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub last_called_at: Option<String>,
}

/// One counter set per [`AlgorithmId`], indexed by its position in `ALL`.
#[derive(Default)]
pub struct MetricsRegistry {
    counters: [AlgorithmCounters; 4],
}

fn slot(id: AlgorithmId) -> usize {
    match id {
        AlgorithmId::Irt => 0,
        AlgorithmId::Dda => 1,
        AlgorithmId::Clustering => 2,
        AlgorithmId::Grouping => 3,
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AlgorithmId) -> &AlgorithmCounters {
        &self.counters[slot(id)]
    }

    pub fn record_call(&self, id: AlgorithmId, latency_us: u64, is_error: bool) {
        let c = self.get(id);
        c.calls.fetch_add(1, Ordering::Relaxed);
        c.latency_total_us.fetch_add(latency_us, Ordering::Relaxed);
        if is_error {
            c.errors.fetch_add(1, Ordering::Relaxed);
        }
        c.latency.observe(latency_us);
        c.last_call_ms
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Runs `f`, recording its latency and whether it returned `Err`.
    pub fn track<T, E>(&self, id: AlgorithmId, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let start = Instant::now();
        let result = f();
        self.record_call(id, start.elapsed().as_micros() as u64, result.is_err());
        result
    }

    pub fn snapshot(&self) -> BTreeMap<String, MetricsSnapshot> {
        AlgorithmId::ALL
            .iter()
            .map(|id| (id.as_str().to_string(), self.get(*id).snapshot()))
            .collect()
    }

    pub fn reset(&self) {
        for c in &self.counters {
            c.calls.store(0, Ordering::Relaxed);
            c.errors.store(0, Ordering::Relaxed);
            c.latency_total_us.store(0, Ordering::Relaxed);
            c.last_call_ms.store(0, Ordering::Relaxed);
            c.latency.clear();
        }
    }
}
