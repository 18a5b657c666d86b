// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Screens and how they reach the chat.
//!
//! Every chat has one pinned message that screens replace in place. The
//! [`Renderer`] edits it when it exists and falls back to sending a new
//! message when the edit fails or there is nothing to edit.

use std::sync::Arc;

use sitebot_core::types::Keyboard;
use sitebot_core::{ChatTransport, SiteError};
use tracing::{debug, warn};

/// A rendered screen: HTML text plus inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Screen {
    pub fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    /// Callback payloads of every button, in row order.
    pub fn callbacks(&self) -> Vec<&str> {
        self.keyboard.callback_data()
    }
}

#[derive(Clone)]
pub struct Renderer {
    transport: Arc<dyn ChatTransport>,
}

impl Renderer {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Show `screen` on the pinned message, updating `pinned` if a new message was sent.
    pub async fn show(
        &self,
        chat_id: i64,
        pinned: &mut Option<i64>,
        screen: &Screen,
    ) -> Result<(), SiteError> {
        if let Some(message_id) = *pinned {
            match self
                .transport
                .edit_message(chat_id, message_id, &screen.text, Some(&screen.keyboard))
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(chat_id, message_id, error = %e, "edit failed, sending a new screen");
                }
            }
        }
        let message_id = self
            .transport
            .send_message(chat_id, &screen.text, Some(&screen.keyboard))
            .await?;
        *pinned = Some(message_id);
        Ok(())
    }

    /// Drop the old pinned message and send `screen` as a fresh one at the bottom of the chat.
    pub async fn replace(
        &self,
        chat_id: i64,
        pinned: &mut Option<i64>,
        screen: &Screen,
    ) -> Result<(), SiteError> {
        if let Some(old) = pinned.take() {
            self.discard(chat_id, old).await;
        }
        self.show(chat_id, pinned, screen).await
    }

    /// Send a standalone message that is not tracked as the pinned screen.
    pub async fn notice(&self, chat_id: i64, text: &str) -> Result<i64, SiteError> {
        self.transport.send_message(chat_id, text, None).await
    }

    /// Delete a message, logging instead of failing.
    pub async fn discard(&self, chat_id: i64, message_id: i64) {
        if let Err(e) = self.transport.delete_message(chat_id, message_id).await {
            debug!(chat_id, message_id, error = %e, "could not delete message");
        }
    }

    pub async fn acknowledge(&self, callback_id: &str) {
        if let Err(e) = self.transport.answer_callback(callback_id, None).await {
            warn!(error = %e, "callback acknowledgement failed");
        }
    }

    /// Resolve a platform file id to a stored reference, keeping the id when resolution fails.
    pub async fn file_reference(&self, file_id: &str) -> String {
        match self.transport.file_url(file_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(file_id, error = %e, "file URL lookup failed");
                format!("telegram:{file_id}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebot_core::types::InlineButton;
    use sitebot_test_utils::{MockTransport, Outbound};

    fn screen(text: &str) -> Screen {
        Screen::new(
            text,
            Keyboard::new().button(InlineButton::callback("Home", "nav:home")),
        )
    }

    #[tokio::test]
    async fn first_screen_is_sent_then_edited() {
        let transport = Arc::new(MockTransport::new());
        let renderer = Renderer::new(transport.clone());
        let mut pinned = None;

        renderer.show(1, &mut pinned, &screen("one")).await.unwrap();
        assert_eq!(pinned, Some(100));
        renderer.show(1, &mut pinned, &screen("two")).await.unwrap();
        assert_eq!(pinned, Some(100));

        let calls = transport.calls().await;
        assert!(matches!(calls[0], Outbound::Sent { message_id: 100, .. }));
        assert!(matches!(calls[1], Outbound::Edited { message_id: 100, .. }));
    }

    #[tokio::test]
    async fn failed_edit_falls_back_to_send() {
        let transport = Arc::new(MockTransport::new());
        let renderer = Renderer::new(transport.clone());
        let mut pinned = Some(7);
        transport.fail_edits(true);

        renderer.show(1, &mut pinned, &screen("x")).await.unwrap();
        assert_eq!(pinned, Some(100));
        assert_eq!(transport.sent_count().await, 1);
    }

    #[tokio::test]
    async fn replace_deletes_the_old_screen() {
        let transport = Arc::new(MockTransport::new());
        let renderer = Renderer::new(transport.clone());
        let mut pinned = Some(7);

        renderer.replace(1, &mut pinned, &screen("menu")).await.unwrap();
        assert_eq!(transport.deleted().await, vec![7]);
        assert_eq!(pinned, Some(100));
    }
}
