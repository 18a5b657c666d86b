// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook update decoding.
//!
//! Only the fields the dispatcher acts on are modelled. Everything else in
//! the update is ignored by serde, and updates without a usable payload
//! (stickers, edited messages, channel posts) decode to `None`.

use serde::Deserialize;
use sitebot_core::types::{Attachment, AttachmentKind, ChatEvent};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Decode a raw webhook body. Malformed JSON yields `None`.
pub fn parse_update(body: &[u8]) -> Option<Update> {
    match serde_json::from_slice(body) {
        Ok(update) => Some(update),
        Err(e) => {
            debug!(error = %e, "ignoring undecodable update");
            None
        }
    }
}

impl Update {
    /// Reduce the update to a [`ChatEvent`], if it carries one.
    pub fn into_event(self) -> Option<ChatEvent> {
        if let Some(query) = self.callback_query {
            let message = query.message?;
            return Some(ChatEvent::Callback {
                chat_id: message.chat.id,
                message_id: Some(message.message_id),
                callback_id: query.id,
                data: query.data.unwrap_or_default(),
            });
        }

        let message = self.message?;
        let chat_id = message.chat.id;
        let message_id = message.message_id;

        if let Some(text) = message.text {
            return Some(ChatEvent::Text {
                chat_id,
                message_id,
                text,
            });
        }

        // Telegram sends several sizes of the same photo; keep the largest.
        if let Some(largest) = message
            .photo
            .as_deref()
            .and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height))
        {
            return Some(ChatEvent::Attachment {
                chat_id,
                message_id,
                attachment: Attachment {
                    kind: AttachmentKind::Photo,
                    file_id: largest.file_id.clone(),
                    file_name: None,
                },
                caption: message.caption,
            });
        }

        if let Some(doc) = message.document {
            return Some(ChatEvent::Attachment {
                chat_id,
                message_id,
                attachment: Attachment {
                    kind: AttachmentKind::Document,
                    file_id: doc.file_id,
                    file_name: doc.file_name,
                },
                caption: message.caption,
            });
        }

        debug!(chat_id, message_id, "ignoring unsupported message type");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(value: serde_json::Value) -> Option<ChatEvent> {
        parse_update(value.to_string().as_bytes()).and_then(Update::into_event)
    }

    #[test]
    fn text_message() {
        let event = decode(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "date": 1700000000,
                "chat": {"id": 555, "type": "private"},
                "from": {"id": 555, "is_bot": false, "first_name": "Oleg"},
                "text": "/start"
            }
        }));
        assert_eq!(
            event,
            Some(ChatEvent::Text {
                chat_id: 555,
                message_id: 10,
                text: "/start".into()
            })
        );
    }

    #[test]
    fn photo_keeps_largest_size() {
        let event = decode(serde_json::json!({
            "update_id": 2,
            "message": {
                "message_id": 11,
                "chat": {"id": 555},
                "caption": "north side",
                "photo": [
                    {"file_id": "small", "width": 90, "height": 60},
                    {"file_id": "large", "width": 1280, "height": 960},
                    {"file_id": "medium", "width": 320, "height": 240}
                ]
            }
        }))
        .unwrap();
        let ChatEvent::Attachment { attachment, caption, .. } = event else {
            panic!("expected attachment");
        };
        assert_eq!(attachment.kind, AttachmentKind::Photo);
        assert_eq!(attachment.file_id, "large");
        assert_eq!(caption.as_deref(), Some("north side"));
    }

    #[test]
    fn document_message() {
        let event = decode(serde_json::json!({
            "update_id": 3,
            "message": {
                "message_id": 12,
                "chat": {"id": 7},
                "document": {"file_id": "doc-1", "file_name": "act.pdf", "mime_type": "application/pdf"}
            }
        }))
        .unwrap();
        let ChatEvent::Attachment { attachment, .. } = event else {
            panic!("expected attachment");
        };
        assert_eq!(attachment.kind, AttachmentKind::Document);
        assert_eq!(attachment.file_name.as_deref(), Some("act.pdf"));
    }

    #[test]
    fn callback_query() {
        let event = decode(serde_json::json!({
            "update_id": 4,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 9, "is_bot": false, "first_name": "A"},
                "message": {"message_id": 99, "chat": {"id": 9}},
                "data": "flow:pick:fa"
            }
        }));
        assert_eq!(
            event,
            Some(ChatEvent::Callback {
                chat_id: 9,
                message_id: Some(99),
                callback_id: "cb-1".into(),
                data: "flow:pick:fa".into()
            })
        );
    }

    #[test]
    fn unsupported_and_malformed_updates_are_none() {
        assert!(decode(serde_json::json!({
            "update_id": 5,
            "message": {"message_id": 1, "chat": {"id": 1}, "sticker": {"file_id": "s"}}
        }))
        .is_none());
        assert!(decode(serde_json::json!({"update_id": 6, "edited_message": {}})).is_none());
        assert!(parse_update(b"{not json").is_none());
    }
}
