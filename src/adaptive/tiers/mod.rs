//! Lookup tables that turn raw player counters into ability bonuses and
//! behaviour metrics. All lookups are pure; `TierCache` memoizes the two
//! that sit on the per-request hot path.

pub mod achievement;
pub mod fail;
pub mod rank;
pub mod success;

use std::collections::HashMap;
use std::sync::Mutex;

pub use fail::FailMetrics;
pub use success::SuccessMetrics;

/// Bounded memo of success/fail metrics keyed by the saturated count.
pub struct TierCache {
    capacity: usize,
    success: Mutex<HashMap<u64, SuccessMetrics>>,
    fail: Mutex<HashMap<u64, FailMetrics>>,
}

impl TierCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            success: Mutex::new(HashMap::new()),
            fail: Mutex::new(HashMap::new()),
        }
    }

    pub fn success(&self, count: u64) -> SuccessMetrics {
        let key = count.min(success::MAX_ATTEMPTS);
        memo(&self.success, self.capacity, key, success::success_metrics)
    }

    pub fn fail(&self, count: u64) -> FailMetrics {
        let key = count.min(success::MAX_ATTEMPTS);
        memo(&self.fail, self.capacity, key, fail::fail_metrics)
    }

    pub fn len(&self) -> usize {
        let s = self.success.lock().map(|m| m.len()).unwrap_or(0);
        let f = self.fail.lock().map(|m| m.len()).unwrap_or(0);
        s + f
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut m) = self.success.lock() {
            m.clear();
        }
        if let Ok(mut m) = self.fail.lock() {
            m.clear();
        }
    }
}

impl Default for TierCache {
    fn default() -> Self {
        Self::new(512)
    }
}

fn memo<T: Clone>(
    map: &Mutex<HashMap<u64, T>>,
    capacity: usize,
    key: u64,
    compute: fn(u64) -> T,
) -> T {
    if let Some(hit) = map.lock().ok().and_then(|m| m.get(&key).cloned()) {
        return hit;
    }
    let value = compute(key);
    if let Ok(mut m) = map.lock() {
        if m.len() >= capacity {
            m.clear();
        }
        m.insert(key, value.clone());
    }
    value
}
