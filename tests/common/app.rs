use std::sync::Arc;

use axum::Router;

use skill_match_backend::adaptive::config::EngineConfig;
use skill_match_backend::adaptive::AdaptiveEngine;
use skill_match_backend::config::{Config, EngineEnvConfig, LimitsConfig, WorkerConfig};
use skill_match_backend::routes::build_router;
use skill_match_backend::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
}

fn test_config(max_players: usize) -> Config {
    // Built directly so parallel tests never race on process env vars.
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        worker: WorkerConfig {
            is_leader: false,
            ..WorkerConfig::default()
        },
        limits: LimitsConfig {
            max_players_per_request: max_players,
        },
        engine: EngineEnvConfig {
            cluster_seed: Some(42),
            max_players,
            ..EngineEnvConfig::default()
        },
    }
}

async fn spawn_with_limit(max_players: usize) -> TestApp {
    let config = test_config(max_players);
    let engine = Arc::new(
        AdaptiveEngine::new(EngineConfig::from_env(&config.engine)).expect("valid engine config"),
    );
    let state = AppState::new(engine);
    let app = build_router(state.clone());

    TestApp { app, state, config }
}

pub async fn spawn_test_server() -> TestApp {
    spawn_with_limit(1000).await
}

pub async fn spawn_test_server_with_player_limit(max_players: usize) -> TestApp {
    spawn_with_limit(max_players).await
}
