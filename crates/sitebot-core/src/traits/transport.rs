// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound chat transport trait.

use async_trait::async_trait;

use crate::error::SiteError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Keyboard;

/// Outbound primitives of the chat platform.
///
/// Message text is HTML formatted. Implementations must treat an edit that
/// leaves the message unchanged as success.
#[async_trait]
pub trait ChatTransport: PluginAdapter {
    /// Sends a new message and returns its message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, SiteError>;

    /// Replaces the text and keyboard of an existing message.
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), SiteError>;

    /// Deletes a message. Missing messages are not an error.
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), SiteError>;

    /// Acknowledges a callback selection, optionally with a short toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>)
    -> Result<(), SiteError>;

    /// Resolves a platform file id into a downloadable URL.
    async fn file_url(&self, file_id: &str) -> Result<String, SiteError>;
}
