//! Batch preparation for matchmaking: per-player profiles and a
//! content-addressed cache of clustering results.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::adaptive::clustering::ClusterResult;
use crate::adaptive::error::{EngineError, EngineResult};
use crate::adaptive::irt::AbilityEstimate;
use crate::adaptive::precision::{round4, ser_round3};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub id: String,
    #[serde(serialize_with = "ser_round3")]
    pub ability: f64,
    #[serde(serialize_with = "ser_round3")]
    pub raw_ability: f64,
    #[serde(serialize_with = "ser_round3")]
    pub difficulty: f64,
    #[serde(serialize_with = "ser_round3")]
    pub probability: f64,
    pub success_count: u64,
    pub fail_count: u64,
    /// Share of attempts that succeeded; 0.5 with no attempts.
    #[serde(serialize_with = "ser_round3")]
    pub success_share: f64,
    #[serde(serialize_with = "ser_round3")]
    pub fail_share: f64,
    pub rank_name: &'static str,
    pub achievements_completed: u32,
}

impl PlayerProfile {
    pub fn from_estimate(
        id: &str,
        raw_ability: f64,
        difficulty: f64,
        success_count: u64,
        fail_count: u64,
        achievements_completed: u32,
        estimate: &AbilityEstimate,
    ) -> Self {
        let (success_share, fail_share) = attempt_shares(success_count, fail_count);
        Self {
            id: id.to_string(),
            ability: estimate.adjusted_ability,
            raw_ability,
            difficulty,
            probability: estimate.probability,
            success_count,
            fail_count,
            success_share,
            fail_share,
            rank_name: estimate.rank,
            achievements_completed,
        }
    }

    pub fn features(&self) -> Vec<f64> {
        vec![self.ability, self.difficulty]
    }
}

pub fn attempt_shares(success_count: u64, fail_count: u64) -> (f64, f64) {
    let total = success_count + fail_count;
    if total == 0 {
        return (0.5, 0.5);
    }
    let inv = 1.0 / total as f64;
    (success_count as f64 * inv, fail_count as f64 * inv)
}

pub fn ensure_unique_ids<'a, I>(ids: I) -> EngineResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(EngineError::DuplicatePlayerId(id.to_string()));
        }
    }
    Ok(())
}

/// Stable key for a feature batch. Features are rounded first so that
/// float noise below display precision still hits the same entry.
pub fn batch_key(features: &[Vec<f64>], k: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update((k as u64).to_le_bytes());
    for row in features {
        hasher.update((row.len() as u64).to_le_bytes());
        for v in row {
            hasher.update(round4(*v).to_bits().to_le_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

pub struct ClusterCache {
    capacity: usize,
    entries: Mutex<HashMap<String, ClusterResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ClusterCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<ClusterResult> {
        let hit = self
            .entries
            .lock()
            .ok()
            .and_then(|m| m.get(key).cloned());
        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        hit
    }

    /// A zero-capacity cache stores nothing.
    pub fn insert(&self, key: String, result: ClusterResult) {
        if self.capacity == 0 {
            return;
        }
        if let Ok(mut m) = self.entries.lock() {
            if m.len() >= self.capacity && !m.contains_key(&key) {
                m.clear();
            }
            m.insert(key, result);
        }
    }

    pub fn clear(&self) -> usize {
        self.entries
            .lock()
            .map(|mut m| {
                let n = m.len();
                m.clear();
                n
            })
            .unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().map(|m| m.len()).unwrap_or(0),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
