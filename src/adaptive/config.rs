use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrtConfig {
    /// Logistic scaling constant `D`.
    pub scaling: f64,
    pub ability_min: f64,
    pub ability_max: f64,
    pub learning_rate: f64,
    pub decay_rate: f64,
    pub smoothing_alpha: f64,
}

impl Default for IrtConfig {
    fn default() -> Self {
        Self {
            scaling: 1.7,
            ability_min: -3.0,
            ability_max: 3.0,
            learning_rate: 0.05,
            decay_rate: 0.01,
            smoothing_alpha: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DdaConfig {
    pub stability_threshold: f64,
    pub momentum_factor: f64,
    /// Largest absolute difficulty change a single adjustment may apply.
    pub max_step: f64,
    pub difficulty_min: f64,
    pub difficulty_max: f64,
    pub target_performance: f64,
    pub adjustment_rate: f64,
    #[serde(default = "default_tanh_gain")]
    pub tanh_gain: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_perfect_probability")]
    pub perfect_probability: f64,
    #[serde(default = "default_perfect_floor")]
    pub perfect_floor: f64,
}

fn default_tanh_gain() -> f64 {
    0.8
}
fn default_damping() -> f64 {
    0.4
}
fn default_perfect_probability() -> f64 {
    0.99
}
fn default_perfect_floor() -> f64 {
    0.5
}

impl Default for DdaConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 0.05,
            momentum_factor: 0.6,
            max_step: 0.15,
            difficulty_min: 0.1,
            difficulty_max: 1.0,
            target_performance: 0.7,
            adjustment_rate: 0.1,
            tanh_gain: 0.8,
            damping: 0.4,
            perfect_probability: 0.99,
            perfect_floor: 0.5,
        }
    }
}

impl DdaConfig {
    pub fn clamp_difficulty(&self, value: f64) -> f64 {
        value.clamp(self.difficulty_min, self.difficulty_max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringConfig {
    pub cluster_count: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Iteration index after which the relaxed convergence bound applies.
    #[serde(default = "default_relaxed_after")]
    pub relaxed_after: usize,
    #[serde(default = "default_relaxed_factor")]
    pub relaxed_factor: f64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Fixed RNG seed; `None` draws from the thread RNG.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_relaxed_after() -> usize {
    5
}
fn default_relaxed_factor() -> f64 {
    10.0
}
fn default_cache_capacity() -> usize {
    64
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            cluster_count: 3,
            max_iterations: 100,
            tolerance: 1e-4,
            relaxed_after: 5,
            relaxed_factor: 10.0,
            cache_capacity: 64,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingConfig {
    pub default_match_size: usize,
    pub max_match_size: usize,
    pub min_score: f64,
    pub allow_cross_cluster: bool,
    pub max_players: usize,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            default_match_size: 2,
            max_match_size: 8,
            min_score: 0.5,
            allow_cross_cluster: true,
            max_players: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub irt: IrtConfig,
    pub dda: DdaConfig,
    pub clustering: ClusteringConfig,
    pub matchmaking: MatchmakingConfig,
    #[serde(default = "default_tier_cache_capacity")]
    pub tier_cache_capacity: usize,
    /// Upper bound on live difficulty sessions per process.
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_tier_cache_capacity() -> usize {
    512
}

fn default_session_capacity() -> usize {
    10_000
}

fn default_session_idle_secs() -> u64 {
    1800
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            irt: IrtConfig::default(),
            dda: DdaConfig::default(),
            clustering: ClusteringConfig::default(),
            matchmaking: MatchmakingConfig::default(),
            tier_cache_capacity: default_tier_cache_capacity(),
            session_capacity: default_session_capacity(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl EngineConfig {
    pub fn from_env(env_config: &crate::config::EngineEnvConfig) -> Self {
        let mut config = Self::default();
        config.dda.stability_threshold = env_config.stability_threshold;
        config.dda.momentum_factor = env_config.momentum_factor;
        config.clustering.cluster_count = env_config.cluster_count;
        config.clustering.max_iterations = env_config.max_iterations;
        config.clustering.tolerance = env_config.tolerance;
        config.clustering.cache_capacity = env_config.cluster_cache_capacity;
        config.clustering.seed = env_config.cluster_seed;
        config.matchmaking.max_players = env_config.max_players;
        config.session_capacity = env_config.session_capacity;
        config.session_idle_secs = env_config.session_idle_secs;
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        let irt = &self.irt;
        if irt.scaling <= 0.0 {
            return Err("irt.scaling must be > 0".to_string());
        }
        if irt.ability_min >= irt.ability_max {
            return Err("irt.ability_min must be < irt.ability_max".to_string());
        }
        if !(0.0..=1.0).contains(&irt.learning_rate) {
            return Err("irt.learning_rate must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&irt.decay_rate) {
            return Err("irt.decay_rate must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&irt.smoothing_alpha) {
            return Err("irt.smoothing_alpha must be in [0,1]".to_string());
        }

        let dda = &self.dda;
        if !(dda.stability_threshold > 0.0 && dda.stability_threshold < 1.0) {
            return Err("dda.stability_threshold must be in (0,1)".to_string());
        }
        if !(0.0..1.0).contains(&dda.momentum_factor) {
            return Err("dda.momentum_factor must be in [0,1)".to_string());
        }
        if !(dda.max_step > 0.0 && dda.max_step <= 0.9) {
            return Err("dda.max_step must be in (0,0.9]".to_string());
        }
        if dda.difficulty_min <= 0.0 || dda.difficulty_min >= dda.difficulty_max {
            return Err("dda difficulty bounds must satisfy 0 < min < max".to_string());
        }
        if !(0.0..=1.0).contains(&dda.target_performance) {
            return Err("dda.target_performance must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&dda.adjustment_rate) {
            return Err("dda.adjustment_rate must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&dda.damping) {
            return Err("dda.damping must be in [0,1]".to_string());
        }

        let cl = &self.clustering;
        if cl.cluster_count == 0 {
            return Err("clustering.cluster_count must be >= 1".to_string());
        }
        if cl.max_iterations == 0 {
            return Err("clustering.max_iterations must be >= 1".to_string());
        }
        if cl.tolerance <= 0.0 || !cl.tolerance.is_finite() {
            return Err("clustering.tolerance must be > 0".to_string());
        }
        if cl.relaxed_factor < 1.0 {
            return Err("clustering.relaxed_factor must be >= 1".to_string());
        }

        let mm = &self.matchmaking;
        if mm.default_match_size < 2 || mm.default_match_size > mm.max_match_size {
            return Err("matchmaking.default_match_size must be in [2, max_match_size]".to_string());
        }
        if !(0.0..=1.0).contains(&mm.min_score) {
            return Err("matchmaking.min_score must be in [0,1]".to_string());
        }
        if mm.max_players == 0 {
            return Err("matchmaking.max_players must be >= 1".to_string());
        }
        if self.tier_cache_capacity == 0 {
            return Err("tier_cache_capacity must be >= 1".to_string());
        }
        if self.session_capacity == 0 {
            return Err("session_capacity must be >= 1".to_string());
        }
        Ok(())
    }
}
