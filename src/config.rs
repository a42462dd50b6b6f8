use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub worker: WorkerConfig,
    pub limits: LimitsConfig,
    pub engine: EngineEnvConfig,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { is_leader: true }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_players_per_request: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_players_per_request: 1000,
        }
    }
}

/// Engine knobs exposed through the environment. Everything else uses the
/// compiled-in defaults of `EngineConfig`.
#[derive(Debug, Clone)]
pub struct EngineEnvConfig {
    pub stability_threshold: f64,
    pub momentum_factor: f64,
    pub cluster_count: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub cluster_cache_capacity: usize,
    pub cluster_seed: Option<u64>,
    pub max_players: usize,
    pub session_capacity: usize,
    /// Difficulty sessions unused for this long are evicted.
    pub session_idle_secs: u64,
}

impl Default for EngineEnvConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 0.05,
            momentum_factor: 0.6,
            cluster_count: 3,
            max_iterations: 100,
            tolerance: 1e-4,
            cluster_cache_capacity: 64,
            cluster_seed: None,
            max_players: LimitsConfig::default().max_players_per_request,
            session_capacity: 10_000,
            session_idle_secs: 1800,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = EngineEnvConfig::default();
        let limits = LimitsConfig {
            max_players_per_request: env_or_parse(
                "MAX_PLAYERS_PER_REQUEST",
                LimitsConfig::default().max_players_per_request,
            ),
        };
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
            },
            engine: EngineEnvConfig {
                stability_threshold: env_or_parse(
                    "ENGINE_STABILITY_THRESHOLD",
                    defaults.stability_threshold,
                ),
                momentum_factor: env_or_parse("ENGINE_MOMENTUM_FACTOR", defaults.momentum_factor),
                cluster_count: env_or_parse("ENGINE_CLUSTER_COUNT", defaults.cluster_count),
                max_iterations: env_or_parse("ENGINE_MAX_ITERATIONS", defaults.max_iterations),
                tolerance: env_or_parse("ENGINE_TOLERANCE", defaults.tolerance),
                cluster_cache_capacity: env_or_parse(
                    "ENGINE_CLUSTER_CACHE_CAPACITY",
                    defaults.cluster_cache_capacity,
                ),
                cluster_seed: env_opt_parse("ENGINE_CLUSTER_SEED"),
                max_players: limits.max_players_per_request,
                session_capacity: env_or_parse("SESSION_CAPACITY", defaults.session_capacity),
                session_idle_secs: env_or_parse("SESSION_IDLE_SECS", defaults.session_idle_secs),
            },
            limits,
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Failed to parse env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Like `env_or_parse` but unset, blank or unparsable values yield `None`.
pub fn env_opt_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Failed to parse env var, ignoring");
            None
        }
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
