use serde::Serialize;

use super::success::{normalized, MAX_ATTEMPTS};
use crate::adaptive::precision::{round3, round4, ser_round3, ser_round4};

struct Tier {
    min: u64,
    max: u64,
    level: &'static str,
    penalty: f64,
}

const FAIL_TIERS: [Tier; 3] = [
    Tier { min: 3, max: 5, level: "Low Failure", penalty: 0.02 },
    Tier { min: 6, max: 50, level: "Moderate Failure", penalty: 0.05 },
    Tier { min: 51, max: 100, level: "High Failure", penalty: 0.10 },
];

const DEFAULT_LEVEL: &str = "Minimal Failure";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailMetrics {
    pub level: &'static str,
    #[serde(serialize_with = "ser_round3")]
    pub rate: f64,
    /// Ability penalty contributed by the fail tier.
    #[serde(serialize_with = "ser_round4")]
    pub penalty: f64,
    #[serde(serialize_with = "ser_round3")]
    pub normalized: f64,
}

/// Returns `(level, normalized, penalty)` for a raw fail count.
pub fn fail_rate(count: u64) -> (&'static str, f64, f64) {
    let norm = normalized(count);
    let equiv = count.min(MAX_ATTEMPTS);
    let (level, tier_penalty) = FAIL_TIERS
        .iter()
        .find(|t| (t.min..=t.max).contains(&equiv))
        .map(|t| (t.level, t.penalty))
        .unwrap_or((DEFAULT_LEVEL, 0.0));
    let penalty = tier_penalty + norm.sqrt() * 0.02;
    (level, round4(norm), round4(penalty))
}

pub fn fail_metrics(count: u64) -> FailMetrics {
    let (level, rate, penalty) = fail_rate(count);
    FailMetrics {
        level,
        rate,
        penalty,
        normalized: round3((rate + penalty).min(1.0)),
    }
}
