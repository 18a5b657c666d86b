// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Sitebot operations bot.
//!
//! Implements [`ChatTransport`] over the raw Bot API (HTML parse mode,
//! inline keyboards) and decodes webhook updates into [`ChatEvent`]s.
//!
//! [`ChatEvent`]: sitebot_core::types::ChatEvent

pub mod api;
pub mod markup;
pub mod update;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sitebot_config::model::TelegramConfig;
use sitebot_core::types::{AdapterType, HealthStatus, Keyboard};
use sitebot_core::{ChatTransport, PluginAdapter, SiteError};
use tracing::{debug, warn};

use crate::api::{BotApi, CallError};
use crate::markup::{fit_message, reply_markup};

pub use update::{Update, parse_update};

/// The subset of a sent `Message` we read back.
#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct File {
    file_path: Option<String>,
}

/// Bot API transport implementing [`ChatTransport`].
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    api: BotApi,
}

impl TelegramTransport {
    /// Creates the transport. Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, SiteError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            SiteError::Config("telegram.bot_token is required for the Telegram transport".into())
        })?;
        Ok(Self {
            api: BotApi::new(&config.api_base_url, token)?,
        })
    }

    pub fn api(&self) -> &BotApi {
        &self.api
    }
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, SiteError> {
        match self.api.call::<serde_json::Value>("getMe", &json!({})).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(CallError::Api(e)) => Ok(HealthStatus::Unhealthy(e.to_string())),
            Err(CallError::Transport(e)) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), SiteError> {
        debug!("Telegram transport shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, SiteError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": fit_message(text),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if keyboard.is_some_and(|kb| !kb.is_empty()) {
            body["reply_markup"] = reply_markup(keyboard);
        }
        let sent: SentMessage = self.api.call("sendMessage", &body).await?;
        Ok(sent.message_id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), SiteError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": fit_message(text),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
            "reply_markup": reply_markup(keyboard),
        });
        match self.api.call::<serde_json::Value>("editMessageText", &body).await {
            Ok(_) => Ok(()),
            Err(CallError::Api(e)) if e.is_not_modified() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), SiteError> {
        let body = json!({"chat_id": chat_id, "message_id": message_id});
        match self.api.call::<bool>("deleteMessage", &body).await {
            Ok(_) => Ok(()),
            Err(CallError::Api(e)) if e.is_message_gone() => {
                debug!(chat_id, message_id, "message already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), SiteError> {
        let mut body = json!({"callback_query_id": callback_id});
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        match self.api.call::<bool>("answerCallbackQuery", &body).await {
            Ok(_) => Ok(()),
            Err(CallError::Api(e)) => {
                // Stale queries (older than ~15 minutes) cannot be answered.
                warn!(error = %e, "callback answer rejected");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn file_url(&self, file_id: &str) -> Result<String, SiteError> {
        let file: File = self.api.call("getFile", &json!({"file_id": file_id})).await?;
        let path = file.file_path.ok_or_else(|| SiteError::Channel {
            message: format!("file {file_id} has no download path"),
            source: None,
        })?;
        Ok(self.api.file_download_url(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebot_core::types::InlineButton;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: Some("1:t".into()),
            api_base_url: base.into(),
            webhook_secret: None,
        }
    }

    fn ok(result: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
    }

    fn failed(description: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": description
        }))
    }

    #[test]
    fn new_requires_bot_token() {
        let mut cfg = config("https://api.telegram.org");
        cfg.bot_token = None;
        assert!(TelegramTransport::new(&cfg).is_err());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let transport = TelegramTransport::new(&config("https://api.telegram.org")).unwrap();
        assert_eq!(transport.name(), "telegram");
        assert_eq!(transport.adapter_type(), AdapterType::Transport);
    }

    #[tokio::test]
    async fn send_message_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": 42,
                "parse_mode": "HTML",
                "reply_markup": {"inline_keyboard": [[{"text": "Menu", "callback_data": "nav:home"}]]}
            })))
            .respond_with(ok(json!({"message_id": 777, "chat": {"id": 42}})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = TelegramTransport::new(&config(&server.uri())).unwrap();
        let kb = Keyboard::new().button(InlineButton::callback("Menu", "nav:home"));
        let id = transport.send_message(42, "<b>Hi</b>", Some(&kb)).await.unwrap();
        assert_eq!(id, 777);
    }

    #[tokio::test]
    async fn unchanged_edit_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/editMessageText"))
            .respond_with(failed("Bad Request: message is not modified"))
            .mount(&server)
            .await;

        let transport = TelegramTransport::new(&config(&server.uri())).unwrap();
        transport.edit_message(42, 5, "same", None).await.unwrap();
    }

    #[tokio::test]
    async fn other_edit_failures_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/editMessageText"))
            .respond_with(failed("Bad Request: message can't be edited"))
            .mount(&server)
            .await;

        let transport = TelegramTransport::new(&config(&server.uri())).unwrap();
        let err = transport.edit_message(42, 5, "text", None).await.unwrap_err();
        assert!(matches!(err, SiteError::Channel { .. }));
    }

    #[tokio::test]
    async fn deleting_missing_message_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/deleteMessage"))
            .respond_with(failed("Bad Request: message to delete not found"))
            .mount(&server)
            .await;

        let transport = TelegramTransport::new(&config(&server.uri())).unwrap();
        transport.delete_message(42, 5).await.unwrap();
    }

    #[tokio::test]
    async fn file_url_resolves_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/getFile"))
            .and(body_partial_json(json!({"file_id": "abc"})))
            .respond_with(ok(json!({"file_id": "abc", "file_path": "documents/file_3.pdf"})))
            .mount(&server)
            .await;

        let transport = TelegramTransport::new(&config(&server.uri())).unwrap();
        let url = transport.file_url("abc").await.unwrap();
        assert_eq!(url, format!("{}/file/bot1:t/documents/file_3.pdf", server.uri()));
    }

    #[tokio::test]
    async fn stale_callback_answer_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot1:t/answerCallbackQuery"))
            .respond_with(failed("Bad Request: query is too old"))
            .mount(&server)
            .await;

        let transport = TelegramTransport::new(&config(&server.uri())).unwrap();
        transport.answer_callback("cb", Some("Done")).await.unwrap();
    }
}
