//! HTTP handlers for the bot gateway.
//!
//! `POST /api/messages` accepts one activity and answers inline with the
//! replies it produced. When a bearer token is configured, the activity
//! endpoint requires it. `/health` is always open.

use super::AppState;
use crate::bot::{parse_activity, CollectingSink};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};

// ── Bearer token auth ───────────────────────────────────────────

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

/// Returns the 401 response when the request does not carry the configured token.
fn require_auth(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    if state.guard.is_authorized(extract_bearer_token(headers)) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Unauthorized: send Authorization: Bearer <token>"
            })),
        ))
    }
}

// ── Handlers ────────────────────────────────────────────────────

/// POST /api/messages
pub async fn handle_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Err(e) = require_auth(&state, &headers) {
        tracing::warn!("Rejected activity without a valid bearer token");
        return e.into_response();
    }

    let activity = match parse_activity(&body) {
        Ok(activity) => activity,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed activity payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("Invalid activity: {e}")})),
            )
                .into_response();
        }
    };

    let sink = CollectingSink::new();
    if let Err(e) = state.bot.on_activity(&activity, &sink).await {
        tracing::error!(error = %e, "Activity handling failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Activity handling failed"})),
        )
            .into_response();
    }

    Json(serde_json::json!({"activities": sink.into_activities()})).into_response()
}

/// GET /health
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
