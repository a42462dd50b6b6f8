use serde::{Deserialize, Serialize, Serializer};

use crate::adaptive::error::{EngineError, EngineResult};
use crate::adaptive::precision::{ser_round3, ser_round4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmId {
    Irt,
    Dda,
    Clustering,
    Grouping,
}

impl AlgorithmId {
    pub const ALL: [AlgorithmId; 4] = [Self::Irt, Self::Dda, Self::Clustering, Self::Grouping];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Irt => "irt",
            Self::Dda => "dda",
            Self::Clustering => "clustering",
            Self::Grouping => "grouping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub fn from_difficulty(difficulty: f64) -> Self {
        if difficulty < 0.3 {
            Self::Easy
        } else if difficulty < 0.6 {
            Self::Medium
        } else {
            Self::Hard
        }
    }
}

/// Output of the probability model consumed by the difficulty controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilitySnapshot {
    #[serde(serialize_with = "ser_round4")]
    pub probability: f64,
    #[serde(serialize_with = "ser_round3")]
    pub adjusted_ability: f64,
}

impl AbilitySnapshot {
    pub const DEFAULT_PROBABILITY: f64 = 0.5;
    pub const DEFAULT_ABILITY: f64 = 0.0;

    /// Parses a loosely-typed snapshot. Missing fields take their defaults;
    /// anything that is not an object or carries a non-numeric field is rejected.
    pub fn from_json(value: &serde_json::Value) -> EngineResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| EngineError::InvalidSnapshot("snapshot must be an object".into()))?;

        let probability = numeric_field(obj, &["probability"])?
            .unwrap_or(Self::DEFAULT_PROBABILITY);
        let adjusted_ability = numeric_field(obj, &["adjustedAbility", "adjusted_ability", "adjustedTheta"])?
            .unwrap_or(Self::DEFAULT_ABILITY);

        if !probability.is_finite() || !adjusted_ability.is_finite() {
            return Err(EngineError::InvalidSnapshot("snapshot values must be finite".into()));
        }

        Ok(Self {
            probability: probability.clamp(0.0, 1.0),
            adjusted_ability,
        })
    }
}

fn numeric_field(
    obj: &serde_json::Map<String, serde_json::Value>,
    keys: &[&str],
) -> EngineResult<Option<f64>> {
    for key in keys {
        match obj.get(*key) {
            None | Some(serde_json::Value::Null) => continue,
            Some(v) => {
                return v
                    .as_f64()
                    .map(Some)
                    .ok_or_else(|| EngineError::InvalidSnapshot(format!("{key} must be a number")));
            }
        }
    }
    Ok(None)
}

/// Raw per-player input for estimation and matchmaking.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub id: String,
    #[serde(default)]
    pub ability: f64,
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
    #[serde(default)]
    pub success_count: i64,
    #[serde(default)]
    pub fail_count: i64,
    #[serde(default = "default_sessions")]
    pub sessions_played: i64,
    #[serde(default)]
    pub previous_ability: Option<f64>,
    #[serde(default)]
    pub rank_name: Option<String>,
    #[serde(default)]
    pub experience: Option<i64>,
    #[serde(default)]
    pub achievements_completed: Option<i64>,
}

fn default_difficulty() -> f64 {
    0.5
}

fn default_sessions() -> i64 {
    1
}

impl PlayerStats {
    pub fn new(id: impl Into<String>, ability: f64, difficulty: f64) -> Self {
        Self {
            id: id.into(),
            ability,
            difficulty,
            sessions_played: 1,
            ..Self::default()
        }
    }

    pub fn with_counts(mut self, success_count: i64, fail_count: i64) -> Self {
        self.success_count = success_count;
        self.fail_count = fail_count;
        self
    }
}

/// Negative counters are treated as zero.
pub fn sanitize_count(count: i64) -> u64 {
    count.max(0) as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterTag {
    Cluster(usize),
    CrossCluster,
}

impl Serialize for ClusterTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Cluster(idx) => serializer.serialize_u64(*idx as u64),
            Self::CrossCluster => serializer.serialize_str("cross-cluster"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchGroup {
    pub member_ids: Vec<String>,
    #[serde(rename = "clusterTag")]
    pub cluster: ClusterTag,
    #[serde(serialize_with = "ser_round3")]
    pub score: f64,
}
