// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal HTTP client for the Telegram Bot API.
//!
//! Every method is a JSON `POST` to `<base>/bot<token>/<method>` answered by
//! the `{ ok, result, description, error_code }` envelope.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use sitebot_core::SiteError;
use tracing::debug;

/// Default request timeout for Bot API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Response envelope shared by all Bot API methods.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

/// An error reported by the Bot API itself (as opposed to transport errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: Option<i64>,
    pub description: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "Bot API error {code}: {}", self.description),
            None => write!(f, "Bot API error: {}", self.description),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Telegram rejects edits whose text and markup are unchanged.
    pub fn is_not_modified(&self) -> bool {
        self.description.contains("message is not modified")
    }

    /// The target message no longer exists or cannot be touched.
    pub fn is_message_gone(&self) -> bool {
        self.description.contains("message to delete not found")
            || self.description.contains("message can't be deleted")
            || self.description.contains("message to edit not found")
    }
}

/// Outcome of a Bot API call.
#[derive(Debug)]
pub enum CallError {
    /// The request never produced a usable envelope.
    Transport(reqwest::Error),
    /// Telegram answered with `ok: false`.
    Api(ApiError),
}

impl From<CallError> for SiteError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Transport(e) => SiteError::Channel {
                message: format!("Bot API request failed: {e}"),
                source: Some(Box::new(e)),
            },
            CallError::Api(e) => SiteError::Channel {
                message: e.to_string(),
                source: Some(Box::new(e)),
            },
        }
    }
}

/// HTTP client bound to one bot token.
#[derive(Debug, Clone)]
pub struct BotApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BotApi {
    /// Creates a client for `token` against `base_url` (normally `https://api.telegram.org`).
    pub fn new(base_url: &str, token: &str) -> Result<Self, SiteError> {
        if token.trim().is_empty() {
            return Err(SiteError::Config("telegram.bot_token cannot be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SiteError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Download URL for a file path returned by `getFile`.
    pub fn file_download_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    /// Calls `method` with a JSON body and decodes `result`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, CallError> {
        debug!(method, "calling Bot API");
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(CallError::Transport)?;

        // Telegram returns the envelope for 4xx responses too, so decode before
        // looking at the status code.
        let envelope: Envelope<T> = response.json().await.map_err(CallError::Transport)?;
        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(CallError::Api(ApiError {
                code: envelope.error_code,
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("{method} returned no result")),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn new_rejects_empty_token() {
        assert!(BotApi::new("https://api.telegram.org", "  ").is_err());
    }

    #[test]
    fn urls_include_token() {
        let api = BotApi::new("https://api.telegram.org/", "123:abc").unwrap();
        assert_eq!(
            api.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        assert_eq!(
            api.file_download_url("photos/file_1.jpg"),
            "https://api.telegram.org/file/bot123:abc/photos/file_1.jpg"
        );
    }

    #[tokio::test]
    async fn call_decodes_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"id": 42, "is_bot": true}
            })))
            .mount(&server)
            .await;

        let api = BotApi::new(&server.uri(), "1:t").unwrap();
        let me: serde_json::Value = api.call("getMe", &serde_json::json!({})).await.unwrap();
        assert_eq!(me["id"], 42);
    }

    #[tokio::test]
    async fn call_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/editMessageText"))
            .and(body_partial_json(serde_json::json!({"chat_id": 5})))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message is not modified"
            })))
            .mount(&server)
            .await;

        let api = BotApi::new(&server.uri(), "1:t").unwrap();
        let err = api
            .call::<serde_json::Value>("editMessageText", &serde_json::json!({"chat_id": 5}))
            .await
            .unwrap_err();
        let CallError::Api(api_err) = err else {
            panic!("expected API error");
        };
        assert_eq!(api_err.code, Some(400));
        assert!(api_err.is_not_modified());
    }
}
