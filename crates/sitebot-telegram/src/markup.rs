// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message shaping: length limits and inline keyboard markup.

use serde_json::{Value, json};
use sitebot_core::types::{ButtonAction, Keyboard};

/// Telegram's limit on message text, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram's limit on `callback_data`, in bytes.
pub const MAX_CALLBACK_DATA: usize = 64;

/// Truncate text to the message limit on a character boundary.
pub fn fit_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LENGTH {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_MESSAGE_LENGTH - 1).collect();
    out.push('…');
    out
}

/// Serialize a keyboard as `reply_markup`. An empty keyboard clears the markup.
pub fn reply_markup(keyboard: Option<&Keyboard>) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .map(|kb| {
            kb.rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| match &button.action {
                            ButtonAction::Callback(data) => {
                                debug_assert!(data.len() <= MAX_CALLBACK_DATA, "callback data too long: {data}");
                                json!({"text": button.text, "callback_data": data})
                            }
                            ButtonAction::Url(url) => json!({"text": button.text, "url": url}),
                        })
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "inline_keyboard": rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebot_core::types::InlineButton;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(fit_message("hello"), "hello");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "я".repeat(5000);
        let fitted = fit_message(&text);
        assert_eq!(fitted.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(fitted.ends_with('…'));
    }

    #[test]
    fn keyboard_serializes_rows() {
        let kb = Keyboard::new()
            .row(vec![
                InlineButton::callback("Yes", "appr:yes:1"),
                InlineButton::callback("No", "appr:no:1"),
            ])
            .button(InlineButton::url("Open", "https://example.com/f"));
        let markup = reply_markup(Some(&kb));
        assert_eq!(markup["inline_keyboard"][0][1]["callback_data"], "appr:no:1");
        assert_eq!(markup["inline_keyboard"][1][0]["url"], "https://example.com/f");
    }

    #[test]
    fn missing_keyboard_clears_markup() {
        assert_eq!(reply_markup(None), json!({"inline_keyboard": []}));
    }
}
