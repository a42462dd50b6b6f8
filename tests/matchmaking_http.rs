mod common;

use std::collections::HashSet;

use axum::http::StatusCode;
use serde_json::json;

use common::app::{spawn_test_server, spawn_test_server_with_player_limit};
use common::http::{assert_json_error, assert_status_ok_json, get_json, post_json, spread_players};

#[tokio::test]
async fn it_matches_pair_every_player_once() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/matches",
        json!({ "players": spread_players(10), "matchSize": 2, "minScore": 0.0 }),
    )
    .await;
    assert_status_ok_json(status, &body);

    let groups = body["data"]["groups"].as_array().unwrap();
    let mut seen = HashSet::new();
    for group in groups {
        let members = group["memberIds"].as_array().unwrap();
        assert_eq!(members.len(), 2);
        for m in members {
            assert!(seen.insert(m.as_str().unwrap().to_string()), "duplicate {m}");
        }
        let score = group["score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
    }

    let summary = &body["data"]["summary"];
    assert_eq!(summary["totalPlayers"], 10);
    assert_eq!(summary["matchSize"], 2);
    assert_eq!(summary["totalMatches"], groups.len());
    assert_eq!(summary["matchedPlayers"], seen.len());
    assert_eq!(
        summary["unmatchedPlayers"].as_u64().unwrap() + summary["matchedPlayers"].as_u64().unwrap(),
        10
    );
    // with no score floor and cross-cluster pooling everyone is placed
    assert_eq!(seen.len(), 10);
}

#[tokio::test]
async fn it_matches_fewer_players_than_size_is_empty() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/matches",
        json!({ "players": spread_players(3), "matchSize": 4 }),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["groups"], json!([]));
    assert_eq!(body["data"]["summary"]["unmatchedPlayers"], 3);
}

#[tokio::test]
async fn it_matches_reject_invalid_batches() {
    let app = spawn_test_server().await;

    let (status, _, body) =
        post_json(&app.app, "/api/matchmaking/matches", json!({ "players": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "EMPTY_PLAYERS");

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/matches",
        json!({ "players": [{ "id": "a", "ability": 0.0 }, { "id": "a", "ability": 1.0 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "DUPLICATE_PLAYER");

    for size in [1, 9] {
        let (status, _, body) = post_json(
            &app.app,
            "/api/matchmaking/matches",
            json!({ "players": spread_players(4), "matchSize": size }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_json_error(&body, "INVALID_MATCH_SIZE");
    }
}

#[tokio::test]
async fn it_matches_enforce_player_limit() {
    let app = spawn_test_server_with_player_limit(3).await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/matches",
        json!({ "players": spread_players(4) }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "TOO_MANY_PLAYERS");
}

#[tokio::test]
async fn it_clusters_cover_every_player() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/clusters",
        json!({ "players": spread_players(6), "clusterCount": 3 }),
    )
    .await;
    assert_status_ok_json(status, &body);
    let data = &body["data"];
    assert_eq!(data["clusterCount"], 3);
    assert_eq!(data["centroids"].as_array().unwrap().len(), 3);
    assert_eq!(data["playerIds"].as_array().unwrap().len(), 6);
    let assignments = data["assignments"].as_array().unwrap();
    assert_eq!(assignments.len(), 6);
    assert!(assignments.iter().all(|a| a.as_u64().unwrap() < 3));
}

#[tokio::test]
async fn it_clusters_name_players_without_ids_by_position() {
    let app = spawn_test_server().await;
    let players: Vec<_> = spread_players(3)
        .into_iter()
        .map(|mut p| {
            p.as_object_mut().unwrap().remove("id");
            p
        })
        .collect();

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/clusters",
        json!({ "players": players, "clusterCount": 1 }),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(
        body["data"]["playerIds"],
        json!(["player_0", "player_1", "player_2"])
    );
}

#[tokio::test]
async fn it_clusters_cap_k_at_batch_size_and_hit_cache() {
    let app = spawn_test_server().await;
    let payload = json!({ "players": spread_players(2), "clusterCount": 5 });

    let (status, _, body) = post_json(&app.app, "/api/matchmaking/clusters", payload.clone()).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["clusterCount"], 2);

    let (status, _, _) = post_json(&app.app, "/api/matchmaking/clusters", payload).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, health) = get_json(&app.app, "/health").await;
    assert_eq!(health["engine"]["clusterCache"]["hits"], 1);
    assert_eq!(health["engine"]["clusterCache"]["entries"], 1);
}

#[tokio::test]
async fn it_opponent_prefers_closest_player() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/opponent",
        json!({
            "playerId": "me",
            "clusterCount": 1,
            "players": [
                { "id": "me", "ability": 0.0, "difficulty": 0.5 },
                { "id": "close", "ability": 0.1, "difficulty": 0.5 },
                { "id": "far", "ability": 2.5, "difficulty": 0.9 },
            ],
        }),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["found"], true);
    let found = &body["data"]["match"];
    assert_eq!(found["playerId"], "me");
    assert_eq!(found["opponent"]["id"], "close");
    let w = &found["weights"];
    let sum = w["ability"].as_f64().unwrap() + w["difficulty"].as_f64().unwrap();
    assert!((sum - 1.0).abs() < 1e-3);
    assert!((0.0..=1.0).contains(&found["score"].as_f64().unwrap()));
}

#[tokio::test]
async fn it_opponent_edge_cases() {
    let app = spawn_test_server().await;

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/opponent",
        json!({ "playerId": "solo", "players": [{ "id": "solo", "ability": 0.0 }] }),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["found"], false);
    assert!(body["data"]["match"].is_null());

    let (status, _, body) = post_json(
        &app.app,
        "/api/matchmaking/opponent",
        json!({ "playerId": "ghost", "players": spread_players(3) }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "UNKNOWN_PLAYER");
}
