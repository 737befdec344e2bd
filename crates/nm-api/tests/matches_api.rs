use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use nm_common::ai::AiUnavailable;
use nm_common::ai::test_support::StubScorer;
use nm_common::{Location, Profile};
use serde_json::Value;
use tower::ServiceExt;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn profiles() -> Vec<Profile> {
    vec![
        Profile {
            display_name: Some("Requester".into()),
            skills: strings(&["Frontend"]),
            interests: strings(&["AI", "Design"]),
            ..Profile::new("me")
        },
        Profile {
            display_name: Some("Bo".into()),
            skills: strings(&["Backend"]),
            interests: strings(&["AI"]),
            location: Some(Location::new("Osaka", "Japan")),
            ..Profile::new("u1")
        },
        Profile {
            display_name: Some("Al".into()),
            skills: strings(&["Sales"]),
            interests: strings(&["Golf"]),
            location: Some(Location::new("Lisbon", "Portugal")),
            ..Profile::new("u2")
        },
    ]
}

fn app(scorer: StubScorer) -> axum::Router {
    nm_api::create_router(nm_api::test_state_with("test-key", profiles(), Arc::new(scorer)))
}

async fn get(app: axum::Router, uri: &str, user: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("x-api-key", "test-key")
                .header("x-user-id", user)
                .header("x-request-id", "req-test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn lists_matches_with_ai_scores() {
    let (status, body) = get(
        app(StubScorer::scoring(60).with_score("u2", 90)),
        "/api/matches",
        "me",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 2);
    assert_eq!(body["matches"][0]["userId"], "u2");
    assert_eq!(body["matches"][0]["rank"], 1);
    assert_eq!(body["matches"][0]["source"], "ai");
    assert!(body["matches"][0]["traditionalScore"].is_number());
    assert_eq!(body["matches"][1]["userId"], "u1");
    assert_eq!(body["runId"].as_str().map(str::len), Some(26));
}

#[tokio::test]
async fn query_filters_are_applied_and_echoed() {
    let (status, body) = get(
        app(StubScorer::failing(AiUnavailable::RateLimited)),
        "/api/matches?location=japan&minScore=0&limit=5&sortBy=name",
        "me",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["matches"][0]["userId"], "u1");
    assert_eq!(body["matches"][0]["source"], "deterministic");
    assert_eq!(body["filters"]["limit"], 5);
    assert_eq!(body["filters"]["location"], "japan");
    assert_eq!(body["filters"]["sortBy"], "name");
}

#[tokio::test]
async fn invalid_filter_is_bad_request() {
    let (status, body) = get(app(StubScorer::scoring(50)), "/api/matches?limit=0", "me").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert_eq!(body["request_id"], "req-test");
}

#[tokio::test]
async fn unknown_requester_is_not_found() {
    let (status, body) = get(app(StubScorer::scoring(50)), "/api/matches", "ghost").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn match_details_fall_back_to_profile_plan() {
    let (status, body) = get(
        app(StubScorer::failing(AiUnavailable::Disabled)),
        "/api/match-details/u1",
        "me",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["targetUser"]["userId"], "u1");
    assert_eq!(body["compatibility"]["source"], "deterministic");
    assert_eq!(body["compatibility"]["sharedInterests"][0], "AI");
    assert_eq!(
        body["meetingSuggestions"]["suggestions"][0]["title"],
        "Networking conversation with Bo"
    );
    assert_eq!(body["aiInsights"]["strengthAreas"][0], "Frontend + Backend");
}

#[tokio::test]
async fn match_details_for_self_or_missing_target() {
    let (status, _) = get(app(StubScorer::scoring(50)), "/api/match-details/me", "me").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(StubScorer::scoring(50)), "/api/match-details/nobody", "me").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
