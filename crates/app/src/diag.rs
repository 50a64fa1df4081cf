use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::problem::ProblemResponse;
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct TestSendQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// Manual test-send: delivers the rendered notification to an arbitrary
/// user id, synchronously, so the operator sees delivery errors directly.
pub async fn test_send(
    State(state): State<AppState>,
    Query(query): Query<TestSendQuery>,
) -> Result<&'static str, ProblemResponse> {
    let user_id = query
        .user_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ProblemResponse::new(
                StatusCode::BAD_REQUEST,
                "missing_user_id",
                "userId query parameter is required",
            )
        })?;

    let token = state.access_token().ok_or_else(|| {
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "missing_access_token",
            "LINE_CHANNEL_ACCESS_TOKEN is not set",
        )
    })?;

    let (url, text) = state.notification_for(&user_id);
    let text = format!("[ทดสอบ] {text}");
    info!(stage = "diag", user_id = %user_id, url = %url, "sending test message");

    state
        .line()
        .push_message(&token, &user_id, &text)
        .await
        .map_err(|err| {
            error!(stage = "diag", user_id = %user_id, error = %err, "test delivery failed");
            ProblemResponse::new(StatusCode::BAD_GATEWAY, "delivery_failed", err.to_string())
        })?;

    Ok("Test message sent successfully")
}

/// Connectivity check against the Messaging API using the configured token.
pub async fn verify_token(
    State(state): State<AppState>,
) -> Result<Json<Value>, ProblemResponse> {
    let token = state.access_token().ok_or_else(|| {
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "missing_access_token",
            "LINE_CHANNEL_ACCESS_TOKEN is not set",
        )
    })?;

    let info = state.line().bot_info(&token).await.map_err(|err| {
        error!(stage = "diag", error = %err, "LINE API connection failed");
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "line_api_unreachable",
            err.to_string(),
        )
    })?;

    Ok(Json(json!({
        "status": "success",
        "message": "LINE API connection successful",
        "botInfo": {
            "userId": info.user_id,
            "basicId": info.basic_id,
            "displayName": info.display_name,
        },
    })))
}
