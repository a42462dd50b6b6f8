mod common;

use std::collections::HashSet;

use axum::http::StatusCode;
use serde_json::{json, Value};

use skill_match_backend::adaptive::config::EngineConfig;
use skill_match_backend::adaptive::engine::{AdjustRequest, MatchRequest};
use skill_match_backend::adaptive::types::{AbilitySnapshot, PlayerStats};
use skill_match_backend::adaptive::AdaptiveEngine;

use common::app::spawn_test_server;
use common::http::{assert_status_ok_json, get_json, post_json};

fn six_players() -> Vec<Value> {
    [-2.0, -1.0, 0.0, 0.0, 1.0, 2.0]
        .iter()
        .enumerate()
        .map(|(i, a)| json!({ "id": format!("p{i}"), "ability": a, "difficulty": 0.5 }))
        .collect()
}

fn member_sets(groups: &[Value]) -> Vec<HashSet<String>> {
    groups
        .iter()
        .map(|g| {
            g["memberIds"]
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m.as_str().unwrap().to_string())
                .collect()
        })
        .collect()
}

#[tokio::test]
async fn at_difficulty_moves_against_the_performance_gap() {
    let mut config = EngineConfig::default();
    config.clustering.seed = Some(42);
    let engine = AdaptiveEngine::new(config).unwrap();

    let request = |session: &str, probability: f64, s: i64, f: i64| AdjustRequest {
        session_id: Some(session.to_string()),
        previous_difficulty: 0.5,
        snapshot: AbilitySnapshot {
            probability,
            adjusted_ability: 0.0,
        },
        success_count: s,
        fail_count: f,
        target_performance: Some(0.7),
        adjustment_rate: Some(0.1),
    };

    let under = engine.adjust_difficulty(request("under", 0.2, 0, 5)).await.unwrap();
    assert!(under.adjustment.new_difficulty > 0.5);

    let over = engine.adjust_difficulty(request("over", 0.8, 5, 0)).await.unwrap();
    assert!(over.adjustment.new_difficulty < 0.5);
}

#[tokio::test]
async fn at_six_player_example_forms_balanced_pairs() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/matches",
        json!({
            "players": six_players(),
            "matchSize": 2,
            "clusterCount": 3,
            "minScore": 0.0,
        }),
    )
    .await;
    assert_status_ok_json(status, &body);

    let groups = body["data"]["groups"].as_array().unwrap().clone();
    assert_eq!(groups.len(), 3);
    let sets = member_sets(&groups);
    let all: HashSet<&String> = sets.iter().flatten().collect();
    assert_eq!(all.len(), 6);

    // identical players always share a cluster and form a perfect pair
    let twins: HashSet<String> = ["p2".to_string(), "p3".to_string()].into();
    let twin_group = groups
        .iter()
        .zip(&sets)
        .find(|(_, s)| **s == twins)
        .map(|(g, _)| g)
        .expect("p2 and p3 paired");
    assert_eq!(twin_group["score"], 1.0);
}

#[tokio::test]
async fn at_single_cluster_matches_adjacent_sort_pairing() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/matches",
        json!({
            "players": six_players(),
            "matchSize": 2,
            "clusterCount": 1,
            "minScore": 0.0,
        }),
    )
    .await;
    assert_status_ok_json(status, &body);

    let groups = body["data"]["groups"].as_array().unwrap().clone();
    let sets = member_sets(&groups);
    let expected: Vec<HashSet<String>> = [["p0", "p1"], ["p2", "p3"], ["p4", "p5"]]
        .iter()
        .map(|pair| pair.iter().map(|s| s.to_string()).collect())
        .collect();
    for pair in &expected {
        assert!(sets.contains(pair), "missing pair {pair:?}");
    }
}

#[tokio::test]
async fn at_estimate_adjust_match_flow() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/estimate/ability",
        json!({ "id": "p0", "ability": -0.5, "difficulty": 0.6, "successCount": 1, "failCount": 6 }),
    )
    .await;
    assert_status_ok_json(status, &body);
    let estimate = body["data"]["estimate"].clone();

    let (status, _, body) = post_json(
        &app.app,
        "/api/difficulty/adjust",
        json!({
            "sessionId": "p0",
            "previousDifficulty": 0.6,
            "snapshot": {
                "probability": estimate["probability"],
                "adjustedAbility": estimate["adjustedAbility"],
            },
            "successCount": 1,
            "failCount": 6,
        }),
    )
    .await;
    assert_status_ok_json(status, &body);
    let delta = body["data"]["appliedDelta"].as_f64().unwrap();
    assert!(delta.abs() <= 0.15 + 1e-9);

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/opponent",
        json!({ "playerId": "p2", "players": six_players() }),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["match"]["opponent"]["id"], "p3");

    let (status, _, metrics) = get_json(&app.app, "/health/metrics").await;
    assert_eq!(status, StatusCode::OK);
    for algo in ["irt", "dda", "clustering"] {
        assert!(
            metrics["algorithms"][algo]["callCount"].as_u64().unwrap() >= 1,
            "{algo} not recorded"
        );
    }
}

#[test]
fn at_library_batch_without_enough_players_is_not_an_error() {
    let engine = AdaptiveEngine::new(EngineConfig::default()).unwrap();
    let players = vec![PlayerStats::new("solo", 0.0, 0.5)];
    let outcome = engine
        .form_matches(&players, MatchRequest::default())
        .unwrap();
    assert!(outcome.groups.is_empty());
    assert_eq!(outcome.summary.unmatched_players, 1);
}
