// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles POST /telegram/webhook, POST /scheduler/tick and GET /health.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitebot_core::types::{EventType, HealthStatus};

use crate::server::GatewayState;

/// Optional body of POST /scheduler/tick.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickRequest {
    /// Evaluate as if it were this instant instead of now.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    /// Run only this rule, ignoring its hour gate.
    #[serde(default)]
    pub rule: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(error: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// POST /telegram/webhook
///
/// Answers 200 for anything that passes the secret check, including bodies
/// that cannot be decoded, so Telegram never retries an update.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !state.auth.webhook_allowed(&headers) {
        tracing::warn!("webhook request with a wrong secret token");
        return StatusCode::UNAUTHORIZED;
    }
    let Some(update) = sitebot_telegram::parse_update(&body) else {
        return StatusCode::OK;
    };
    let update_id = update.update_id;
    match update.into_event() {
        Some(event) => state.dispatcher.handle(event).await,
        None => tracing::debug!(update_id, "update carries nothing to handle"),
    }
    StatusCode::OK
}

/// POST /scheduler/tick
pub async fn post_tick(State(state): State<GatewayState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        TickRequest::default()
    } else {
        match serde_json::from_slice::<TickRequest>(&body) {
            Ok(request) => request,
            Err(e) => return bad_request(format!("invalid tick request: {e}")),
        }
    };
    let only = match request.rule.as_deref() {
        Some(name) => match name.parse::<EventType>() {
            Ok(rule) => Some(rule),
            Err(_) => return bad_request(format!("unknown rule `{name}`")),
        },
        None => None,
    };
    let at = request.at.unwrap_or_else(|| state.scheduler.now());
    let report = state.scheduler.run_tick(at, only).await;
    Json(report).into_response()
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let version = env!("CARGO_PKG_VERSION").to_string();
    let (code, status, detail) = match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok", None),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, "degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(reason))
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            Some(e.to_string()),
        ),
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version,
            detail,
        }),
    )
        .into_response()
}
