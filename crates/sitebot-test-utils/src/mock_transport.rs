// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.
//!
//! `MockTransport` implements `ChatTransport` by recording every call. Sent
//! messages get increasing message ids starting at 100.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use sitebot_core::types::{AdapterType, HealthStatus, Keyboard};
use sitebot_core::{ChatTransport, PluginAdapter, SiteError};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Sent {
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edited {
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Deleted {
        chat_id: i64,
        message_id: i64,
    },
    Answered {
        callback_id: String,
        text: Option<String>,
    },
}

impl Outbound {
    /// Text of a sent or edited message.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Sent { text, .. } | Self::Edited { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Self::Sent { keyboard, .. } | Self::Edited { keyboard, .. } => keyboard.as_ref(),
            _ => None,
        }
    }
}

/// A recording chat transport.
pub struct MockTransport {
    calls: Arc<Mutex<Vec<Outbound>>>,
    next_id: AtomicI64,
    fail_edits: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicI64::new(100),
            fail_edits: AtomicBool::new(false),
        }
    }

    /// Make every subsequent edit fail, as when the message was deleted by the user.
    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// All recorded calls in order.
    pub async fn calls(&self) -> Vec<Outbound> {
        self.calls.lock().await.clone()
    }

    /// The most recent sent or edited message.
    pub async fn last_screen(&self) -> Option<Outbound> {
        self.calls
            .lock()
            .await
            .iter()
            .rev()
            .find(|c| c.text().is_some())
            .cloned()
    }

    /// Text of the most recent sent or edited message, or an empty string.
    pub async fn last_text(&self) -> String {
        self.last_screen()
            .await
            .and_then(|c| c.text().map(str::to_string))
            .unwrap_or_default()
    }

    /// Callback payloads on the most recent screen.
    pub async fn last_buttons(&self) -> Vec<String> {
        self.last_screen()
            .await
            .and_then(|c| c.keyboard().cloned())
            .map(|kb| kb.callback_data().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub async fn sent_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, Outbound::Sent { .. }))
            .count()
    }

    pub async fn answered_callbacks(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                Outbound::Answered { callback_id, .. } => Some(callback_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn deleted(&self) -> Vec<i64> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                Outbound::Deleted { message_id, .. } => Some(*message_id),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.calls.lock().await.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, SiteError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SiteError> {
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, SiteError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().await.push(Outbound::Sent {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), SiteError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(SiteError::Channel {
                message: "Bad Request: message to edit not found".into(),
                source: None,
            });
        }
        self.calls.lock().await.push(Outbound::Edited {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), SiteError> {
        self.calls.lock().await.push(Outbound::Deleted {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), SiteError> {
        self.calls.lock().await.push(Outbound::Answered {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }

    async fn file_url(&self, file_id: &str) -> Result<String, SiteError> {
        Ok(format!("mock://files/{file_id}"))
    }
}
