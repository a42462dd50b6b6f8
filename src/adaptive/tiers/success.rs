use serde::Serialize;

use crate::adaptive::precision::{round3, round4, ser_round3, ser_round4};

/// Counts at or above this saturate to a normalized rate of 1.0.
pub const MAX_ATTEMPTS: u64 = 100;

struct Tier {
    min: u64,
    max: u64,
    level: &'static str,
    bias: f64,
}

const SUCCESS_TIERS: [Tier; 3] = [
    Tier { min: 3, max: 5, level: "Newbie", bias: 0.02 },
    Tier { min: 6, max: 50, level: "Intermediate", bias: 0.05 },
    Tier { min: 51, max: 100, level: "Pro", bias: 0.10 },
];

const DEFAULT_LEVEL: &str = "Beginner";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessMetrics {
    pub level: &'static str,
    /// Success count normalized to [0, 1].
    #[serde(serialize_with = "ser_round3")]
    pub rate: f64,
    #[serde(serialize_with = "ser_round3")]
    pub consistency: f64,
    /// Ability bonus contributed by the success tier.
    #[serde(serialize_with = "ser_round4")]
    pub bias: f64,
}

pub fn normalized(count: u64) -> f64 {
    (count as f64 / MAX_ATTEMPTS as f64).min(1.0)
}

/// Returns `(level, normalized, bias)` for a raw success count.
pub fn success_rate(count: u64) -> (&'static str, f64, f64) {
    let norm = normalized(count);
    let equiv = count.min(MAX_ATTEMPTS);
    let (level, tier_bias) = SUCCESS_TIERS
        .iter()
        .find(|t| (t.min..=t.max).contains(&equiv))
        .map(|t| (t.level, t.bias))
        .unwrap_or((DEFAULT_LEVEL, 0.0));
    let bias = tier_bias + norm.sqrt() * 0.02;
    (level, round4(norm), round4(bias))
}

pub fn success_metrics(count: u64) -> SuccessMetrics {
    let (level, norm, bias) = success_rate(count);
    SuccessMetrics {
        level,
        rate: round3(norm),
        consistency: round3((norm + bias).min(1.0)),
        bias,
    }
}
