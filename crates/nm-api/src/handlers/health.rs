use axum::{Json, extract::State};
use serde_json::json;
use tokio::time::{Duration, timeout};

use crate::SharedState;
use crate::error::ApiError;

const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn livez() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readyz(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.readiness.load(std::sync::atomic::Ordering::SeqCst) {
        return Err(ApiError::ServiceUnavailable("shutting_down".into()));
    }

    timeout(READINESS_TIMEOUT, state.service.store().health_check())
        .await
        .map_err(|_| ApiError::ServiceUnavailable("store_health_timeout".into()))
        .and_then(|result| {
            result.map_err(|err| ApiError::ServiceUnavailable(format!("store health check failed: {err}")))
        })?;

    Ok(Json(json!({
        "status": "ok",
        "store": "ok",
        "scorer": state.service.orchestrator().scorer().name(),
        "application": env!("CARGO_PKG_NAME"),
    })))
}
