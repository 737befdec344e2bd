use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use nm_common::Profile;
use nm_common::ai::{AiUnavailable, CompatibilityScorer, HttpCompatibilityScorer, LlmRuntimeConfig};
use nm_common::matching::MatchSource;
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn spawn_completion_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr) -> LlmRuntimeConfig {
    LlmRuntimeConfig {
        endpoint: format!("http://{addr}/v1/chat/completions"),
        api_key: "test-key".into(),
        timeout: Duration::from_millis(500),
        ..LlmRuntimeConfig::default()
    }
}

fn completion(content: &str) -> Value {
    json!({
        "model": "llama3-8b-8192",
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

fn pair() -> (Profile, Profile) {
    (
        Profile {
            skills: vec!["Frontend".into()],
            interests: vec!["AI".into()],
            ..Profile::new("me")
        },
        Profile {
            skills: vec!["Backend".into()],
            interests: vec!["AI".into()],
            ..Profile::new("u1")
        },
    )
}

async fn score_against(app: Router) -> Result<nm_common::matching::MatchResult, AiUnavailable> {
    let addr = spawn_completion_server(app).await;
    let scorer = HttpCompatibilityScorer::new(config_for(addr)).unwrap();
    let (requester, candidate) = pair();
    scorer.score(&requester, &candidate).await
}

#[tokio::test]
async fn parses_successful_completion() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["response_format"]["type"], "json_object");
            assert_eq!(body["messages"][0]["role"], "system");
            let content = json!({
                "compatibilityScore": 82,
                "reasoning": "Strong overlap in AI",
                "sharedInterests": ["AI"],
                "complementarySkills": ["Frontend + Backend"],
                "meetingTopics": ["Model serving"],
                "collaborationPotential": "High",
                "networkingValue": "High"
            })
            .to_string();
            Json(completion(&content))
        }),
    );

    let result = score_against(app).await.unwrap();
    assert_eq!(result.score, 82);
    assert_eq!(result.source, MatchSource::Ai);
    assert_eq!(result.shared_interests, vec!["AI".to_string()]);
    assert_eq!(result.model.as_deref(), Some("llama3-8b-8192"));
}

#[tokio::test]
async fn rate_limit_is_reported() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { StatusCode::TOO_MANY_REQUESTS }),
    );

    assert_eq!(score_against(app).await.unwrap_err(), AiUnavailable::RateLimited);
}

#[tokio::test]
async fn server_error_carries_status() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (StatusCode::BAD_GATEWAY, "upstream exploded").into_response()
        }),
    );

    match score_against(app).await.unwrap_err() {
        AiUnavailable::Status { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_content_is_malformed() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(completion("I think they would get along great.")) }),
    );

    assert!(matches!(
        score_against(app).await.unwrap_err(),
        AiUnavailable::Malformed(_)
    ));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Response::new(axum::body::Body::empty())
        }),
    );

    assert!(matches!(
        score_against(app).await.unwrap_err(),
        AiUnavailable::Timeout(_)
    ));
}

#[tokio::test]
async fn missing_key_short_circuits() {
    let scorer = HttpCompatibilityScorer::new(LlmRuntimeConfig {
        endpoint: "http://127.0.0.1:9/unused".into(),
        ..LlmRuntimeConfig::default()
    })
    .unwrap();
    let (requester, candidate) = pair();

    assert_eq!(
        scorer.score(&requester, &candidate).await.unwrap_err(),
        AiUnavailable::Disabled
    );
}
