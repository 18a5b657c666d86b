// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request authentication for the gateway.
//!
//! Two independent checks:
//! 1. The Telegram webhook carries `X-Telegram-Bot-Api-Secret-Token` when a
//!    secret was registered with `setWebhook`.
//! 2. The scheduler tick requires `Authorization: Bearer <token>`. Without a
//!    configured token every tick request is rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

pub const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected webhook secret. `None` accepts any webhook request.
    pub webhook_secret: Option<String>,
    /// Expected bearer token for the tick endpoint.
    pub scheduler_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "scheduler_token",
                &self.scheduler_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    pub fn webhook_allowed(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.webhook_secret.as_deref() else {
            return true;
        };
        headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|given| given == expected)
    }
}

/// Middleware guarding the scheduler routes with the bearer token.
pub async fn require_scheduler_token(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.scheduler_token.as_deref() else {
        tracing::error!("gateway.scheduler_token is not set -- rejecting tick request");
        return Err(StatusCode::UNAUTHORIZED);
    };
    let given = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if given == Some(expected) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("tick request with a missing or wrong bearer token");
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn webhook_without_secret_is_open() {
        let auth = AuthConfig::default();
        assert!(auth.webhook_allowed(&HeaderMap::new()));
    }

    #[test]
    fn webhook_secret_must_match() {
        let auth = AuthConfig {
            webhook_secret: Some("s3cret".into()),
            scheduler_token: None,
        };
        let mut headers = HeaderMap::new();
        assert!(!auth.webhook_allowed(&headers));
        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("nope"));
        assert!(!auth.webhook_allowed(&headers));
        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(auth.webhook_allowed(&headers));
    }

    #[test]
    fn debug_redacts_secrets() {
        let auth = AuthConfig {
            webhook_secret: Some("s3cret".into()),
            scheduler_token: Some("tick-token".into()),
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("tick-token"));
        assert!(debug.contains("[redacted]"));
    }
}
