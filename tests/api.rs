//! Router-level tests over the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For `oneshot`

use tourney_desk::{
    config::AppConfig,
    dao::tournament_store::MemoryStore,
    routes,
    state::AppState,
};

async fn app() -> Router {
    let state = AppState::new(AppConfig::default(), None);
    state.install_store(Arc::new(MemoryStore::new())).await;
    routes::router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create `weekly` with `players` participants and return their ids in seed order.
async fn seeded_tournament(app: &Router, players: &[&str]) -> Vec<u64> {
    let (status, _) = send(
        app,
        "POST",
        "/api/tournaments",
        Some(json!({"name": "Weekly", "url": "weekly"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut ids = Vec::new();
    for name in players {
        let (status, body) = send(
            app,
            "POST",
            "/api/participants/weekly",
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(body["participant"]["id"].as_u64().unwrap());
    }
    ids
}

#[tokio::test]
async fn invalid_payload_lists_details() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/tournaments",
        Some(json!({"name": "", "url": "bad url!", "signupCap": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(!body["details"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/api/tournaments",
        Some(json!({"name": "Weekly", "url": "weekly", "tournamentType": "swiss"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn created_tournament_is_found_by_slug() {
    let app = app().await;
    seeded_tournament(&app, &[]).await;

    let (status, body) = send(&app, "GET", "/api/tournament/weekly", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["tournament"]["state"], "pending");

    let (status, _) = send(&app, "GET", "/api/tournament/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let app = app().await;
    seeded_tournament(&app, &[]).await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/tournament/weekly",
        Some(json!({"name": "Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/tournament/weekly",
        Some(json!({"name": "Renamed", "expectedVersion": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["currentVersion"].is_u64());

    let version = body["currentVersion"].as_u64().unwrap();
    let (status, body) = send(
        &app,
        "PUT",
        "/api/tournament/weekly",
        Some(json!({"name": "Renamed", "expectedVersion": version})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournament"]["name"], "Renamed");
    assert_eq!(body["tournament"]["version"], version + 1);
}

#[tokio::test]
async fn preview_follows_custom_order() {
    let app = app().await;
    let ids = seeded_tournament(&app, &["Alice", "Bob", "Carol", "Dave"]).await;

    let order = json!({ "seedOrder": [ids[2], ids[0]] });
    let (status, body) = send(
        &app,
        "POST",
        "/api/bracket-editor/weekly/preview",
        Some(order),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let previewed: Vec<u64> = body["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|participant| participant["id"].as_u64().unwrap())
        .collect();
    assert_eq!(previewed, vec![ids[2], ids[0], ids[1], ids[3]]);

    let (status, body) = send(&app, "POST", "/api/bracket-editor/weekly/preview", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchCount"], 3);
}

#[tokio::test]
async fn preview_is_refused_once_started() {
    let app = app().await;
    seeded_tournament(&app, &["Alice", "Bob", "Carol", "Dave"]).await;

    let (status, _) = send(&app, "POST", "/api/tournament/weekly/start", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/bracket-editor/weekly/preview", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn duplicate_seed_assignments_are_rejected() {
    let app = app().await;
    let ids = seeded_tournament(&app, &["Alice", "Bob"]).await;

    let seeds = json!({"seeds": [
        {"participantId": ids[0], "seed": 1},
        {"participantId": ids[1], "seed": 1},
    ]});
    let (status, body) = send(&app, "POST", "/api/bracket-editor/weekly/apply-seeds", Some(seeds)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["details"].as_array().unwrap().is_empty());

    let seeds = json!({"seeds": [
        {"participantId": ids[0], "seed": 2},
        {"participantId": ids[1], "seed": 1},
    ]});
    let (status, body) = send(&app, "POST", "/api/bracket-editor/weekly/apply-seeds", Some(seeds)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["updated"], 2);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn winner_report_advances_the_bracket() {
    let app = app().await;
    seeded_tournament(&app, &["Alice", "Bob", "Carol", "Dave"]).await;
    send(&app, "POST", "/api/tournament/weekly/start", None).await;

    let (status, body) = send(&app, "GET", "/api/matches/weekly?state=open", None).await;
    assert_eq!(status, StatusCode::OK);
    let open = body["matches"].as_array().unwrap();
    assert_eq!(open.len(), 2);
    let first = &open[0];
    let match_id = first["id"].as_u64().unwrap();
    let winner = first["player1Id"].as_u64().unwrap();

    let uri = format!("/api/matches/weekly/{match_id}/winner");
    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({"winnerId": winner, "scores": "2-0"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["match"]["effectiveState"], "complete");

    let (_, body) = send(&app, "GET", "/api/matches/weekly/stats", None).await;
    assert_eq!(body["completed"], 1);
}

#[tokio::test]
async fn match_stats_are_flat_counters() {
    let app = app().await;
    seeded_tournament(&app, &["Alice", "Bob", "Carol", "Dave"]).await;
    send(&app, "POST", "/api/tournament/weekly/start", None).await;

    let (status, body) = send(&app, "GET", "/api/matches/weekly/stats", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body.get("stats").is_none());
    assert_eq!(body["total"].as_u64(), Some(3));
    assert_eq!(body["open"].as_u64(), Some(2));
    assert_eq!(body["pending"].as_u64(), Some(1));
    assert_eq!(body["completed"].as_u64(), Some(0));
    assert_eq!(body["underway"].as_u64(), Some(0));
    assert!(body["progress"].is_number());
}

#[tokio::test]
async fn health_and_status_report_the_store() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["degraded"], false);
    assert_eq!(body["challongeConfigured"], false);
    assert!(body["connectedIntervalMs"].as_u64().unwrap() > 0);

    let (status, body) = send(&app, "GET", "/api/displays", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["displays"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn degraded_without_store() {
    let app = routes::router(AppState::new(AppConfig::default(), None));

    let (_, body) = send(&app, "GET", "/healthcheck", None).await;
    assert_eq!(body["status"], "degraded");

    let (status, _) = send(&app, "GET", "/api/tournaments", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
